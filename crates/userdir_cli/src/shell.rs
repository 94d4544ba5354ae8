//! Interactive command loop.
//!
//! # Responsibility
//! - Read commands and field values from an input stream.
//! - Call `UserService` and print results or recoverable errors.
//!
//! # Invariants
//! - Recoverable failures (validation, not found, duplicate, constraint)
//!   offer a retry; other storage failures abort only the current command.
//! - End of input exits the loop cleanly at any prompt.

use crate::table::render_users;
use log::{error, warn};
use std::io::{self, BufRead, Write};
use userdir_core::{RepoError, UserInput, UserRepository, UserService};

/// Commands in help order, with their descriptions.
const COMMANDS: &[(&str, &str)] = &[
    ("create", "Create a new user in the database."),
    ("get", "Retrieve a user's details by their email."),
    ("list", "List all users in the database."),
    ("update", "Update an existing user's details."),
    ("delete", "Delete a user by their email."),
    ("delete_all", "Delete all users from the database."),
    (
        "help",
        "Show the list of available commands and their descriptions.",
    ),
    ("exit", "Leave the application."),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Create,
    Get,
    List,
    Update,
    Delete,
    DeleteAll,
    Help,
    Exit,
}

impl Command {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "create" => Some(Self::Create),
            "get" => Some(Self::Get),
            "list" => Some(Self::List),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "delete_all" => Some(Self::DeleteAll),
            "help" => Some(Self::Help),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Prompt-driven front end over a `UserService`.
pub struct Shell<R, W, U: UserRepository> {
    input: R,
    output: W,
    service: UserService<U>,
}

impl<R: BufRead, W: Write, U: UserRepository> Shell<R, W, U> {
    pub fn new(input: R, output: W, service: UserService<U>) -> Self {
        Self {
            input,
            output,
            service,
        }
    }

    /// Runs until `exit` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        writeln!(self.output, "Welcome to users application.\n")?;
        writeln!(
            self.output,
            "Type 'help' to see the list of available commands.\n"
        )?;

        loop {
            writeln!(self.output, "Enter command")?;
            let Some(line) = self.prompt(">>> ")? else {
                break;
            };

            let flow = match Command::parse(&line) {
                Some(Command::Create) => self.create_user()?,
                Some(Command::Get) => self.get_user()?,
                Some(Command::List) => self.list_users()?,
                Some(Command::Update) => self.update_user()?,
                Some(Command::Delete) => self.delete_user()?,
                Some(Command::DeleteAll) => self.delete_all_users()?,
                Some(Command::Help) => self.print_help()?,
                Some(Command::Exit) => Flow::Exit,
                None => {
                    writeln!(
                        self.output,
                        "Unsupported command! Type 'help' to see the list of commands.\n"
                    )?;
                    Flow::Continue
                }
            };

            if flow == Flow::Exit {
                break;
            }
        }

        writeln!(self.output, "Exiting")?;
        self.output.flush()
    }

    fn create_user(&mut self) -> io::Result<Flow> {
        loop {
            let Some(input) = self.read_user_input("Enter email: ", "")? else {
                return Ok(Flow::Exit);
            };
            match self.service.create_user(&input) {
                Ok(user) => {
                    writeln!(self.output, "User {} successfully created.", user.email())?;
                    return Ok(Flow::Continue);
                }
                Err(err) => {
                    if let Some(flow) = self.handle_failure(&err, "user creation")? {
                        return Ok(flow);
                    }
                }
            }
        }
    }

    fn get_user(&mut self) -> io::Result<Flow> {
        loop {
            let Some(email) = self.read_email("Enter email: ")? else {
                return Ok(Flow::Exit);
            };
            match self.service.get_user(&email) {
                Ok(user) => {
                    writeln!(
                        self.output,
                        "User found: id={} email={} name={} surname={} age={}",
                        user.id(),
                        user.email(),
                        user.name(),
                        user.surname(),
                        user.age()
                    )?;
                    return Ok(Flow::Continue);
                }
                Err(err) => {
                    if let Some(flow) = self.handle_failure(&err, "user retrieval")? {
                        return Ok(flow);
                    }
                }
            }
        }
    }

    fn list_users(&mut self) -> io::Result<Flow> {
        match self.service.list_users() {
            Ok(users) => write!(self.output, "{}", render_users(&users))?,
            Err(err) => self.report_fatal(&err)?,
        }
        Ok(Flow::Continue)
    }

    fn update_user(&mut self) -> io::Result<Flow> {
        loop {
            let Some(input) = self.read_user_input(
                "Enter the email of the user to update: ",
                "new ",
            )?
            else {
                return Ok(Flow::Exit);
            };
            match self.service.update_user(&input) {
                Ok(user) => {
                    writeln!(self.output, "User {} successfully updated.", user.email())?;
                    return Ok(Flow::Continue);
                }
                Err(err) => {
                    if let Some(flow) = self.handle_failure(&err, "update")? {
                        return Ok(flow);
                    }
                }
            }
        }
    }

    fn delete_user(&mut self) -> io::Result<Flow> {
        loop {
            let Some(email) = self.read_email("Enter email: ")? else {
                return Ok(Flow::Exit);
            };
            match self.service.delete_user(&email) {
                Ok(()) => {
                    writeln!(self.output, "User with email {email} successfully deleted.")?;
                    return Ok(Flow::Continue);
                }
                Err(err) => {
                    if let Some(flow) = self.handle_failure(&err, "deletion")? {
                        return Ok(flow);
                    }
                }
            }
        }
    }

    fn delete_all_users(&mut self) -> io::Result<Flow> {
        let question = "Are you sure you want to delete all users? This action cannot be undone. (yes/no): ";
        match self.confirm(question)? {
            None => return Ok(Flow::Exit),
            Some(false) => {
                writeln!(self.output, "Action canceled.")?;
                return Ok(Flow::Continue);
            }
            Some(true) => {}
        }

        match self.service.delete_all_users() {
            Ok(count) => writeln!(
                self.output,
                "All users have been successfully deleted ({count} removed)."
            )?,
            Err(err) => self.report_fatal(&err)?,
        }
        Ok(Flow::Continue)
    }

    fn print_help(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\nAvailable commands:")?;
        for (name, description) in COMMANDS {
            writeln!(self.output, "  {name}: {description}")?;
        }
        writeln!(self.output)?;
        Ok(Flow::Continue)
    }

    /// Prints a failure. Returns `Some(flow)` when the command should stop,
    /// `None` when the operator asked to retry.
    fn handle_failure(&mut self, err: &RepoError, menu: &str) -> io::Result<Option<Flow>> {
        if !is_recoverable(err) {
            self.report_fatal(err)?;
            return Ok(Some(Flow::Continue));
        }

        warn!(
            "event=command_failed module=cli status=error menu={menu} kind={}",
            error_kind(err)
        );
        writeln!(self.output, "Error: {err}")?;
        match self.confirm("Do you want to retry? (yes/no): ")? {
            None => Ok(Some(Flow::Exit)),
            Some(true) => Ok(None),
            Some(false) => {
                writeln!(self.output, "Exiting the {menu} menu.")?;
                Ok(Some(Flow::Continue))
            }
        }
    }

    fn report_fatal(&mut self, err: &RepoError) -> io::Result<()> {
        error!(
            "event=command_failed module=cli status=error kind={} error={err}",
            error_kind(err)
        );
        writeln!(self.output, "Error: {err}")
    }

    fn read_user_input(
        &mut self,
        email_prompt: &str,
        field_prefix: &str,
    ) -> io::Result<Option<UserInput>> {
        let Some(email) = self.prompt(email_prompt)? else {
            return Ok(None);
        };
        if !field_prefix.is_empty() {
            writeln!(self.output, "Enter the updated details:")?;
        }
        let Some(name) = self.prompt(&format!("Enter {field_prefix}name: "))? else {
            return Ok(None);
        };
        let Some(surname) = self.prompt(&format!("Enter {field_prefix}surname: "))? else {
            return Ok(None);
        };
        let Some(age) = self.prompt(&format!("Enter {field_prefix}age: "))? else {
            return Ok(None);
        };

        Ok(Some(UserInput {
            name,
            surname,
            age,
            email: email.to_lowercase(),
        }))
    }

    /// Prompts until a non-empty email is entered.
    fn read_email(&mut self, label: &str) -> io::Result<Option<String>> {
        loop {
            let Some(email) = self.prompt(label)? else {
                return Ok(None);
            };
            if !email.is_empty() {
                return Ok(Some(email.to_lowercase()));
            }
            writeln!(self.output, "Email cannot be empty. Please try again.")?;
        }
    }

    fn confirm(&mut self, question: &str) -> io::Result<Option<bool>> {
        loop {
            let Some(answer) = self.prompt(question)? else {
                return Ok(None);
            };
            match answer.to_lowercase().as_str() {
                "yes" | "y" => return Ok(Some(true)),
                "no" | "n" => return Ok(Some(false)),
                _ => writeln!(self.output, "Invalid input. Please enter 'yes' or 'no'.")?,
            }
        }
    }

    /// Writes `label` and reads one trimmed line; `None` on end of input.
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

fn is_recoverable(err: &RepoError) -> bool {
    matches!(
        err,
        RepoError::Validation(_)
            | RepoError::NotFound(_)
            | RepoError::DuplicateKey(_)
            | RepoError::Constraint(_)
    )
}

fn error_kind(err: &RepoError) -> &'static str {
    match err {
        RepoError::Validation(_) => "validation",
        RepoError::NotFound(_) => "not_found",
        RepoError::DuplicateKey(_) => "duplicate_key",
        RepoError::Constraint(_) => "constraint",
        RepoError::InvalidData(_) => "invalid_data",
        RepoError::UninitializedStore { .. } | RepoError::MissingRequiredTable(_) => "schema",
        RepoError::Db(_) => "db",
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, Shell};
    use std::io::Cursor;
    use tempfile::TempDir;
    use userdir_core::{open_db, SqliteUserRepository, UserRepository, UserService};

    fn run_script(script: &str) -> (TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        drop(open_db(&path).unwrap());
        let repo = SqliteUserRepository::try_new(&path).unwrap();

        let mut output = Vec::new();
        let mut shell = Shell::new(
            Cursor::new(script.to_string()),
            &mut output,
            UserService::new(repo),
        );
        shell.run().unwrap();
        drop(shell);

        (dir, String::from_utf8(output).unwrap())
    }

    fn repo_for(dir: &TempDir) -> SqliteUserRepository {
        SqliteUserRepository::try_new(dir.path().join("users.db")).unwrap()
    }

    #[test]
    fn parses_commands_case_insensitively() {
        assert_eq!(Command::parse(" LIST "), Some(Command::List));
        assert_eq!(Command::parse("delete_all"), Some(Command::DeleteAll));
        assert_eq!(Command::parse("drop"), None);
    }

    #[test]
    fn create_then_list_prints_table() {
        let (_dir, output) =
            run_script("create\nJohn@Example.COM\n John \nDoe\n25\nlist\nexit\n");

        assert!(output.contains("User john@example.com successfully created."));
        assert!(output.contains("1  | john@example.com | john | doe     | 25"));
        assert!(output.ends_with("Exiting\n"));
    }

    #[test]
    fn invalid_input_offers_retry() {
        let (dir, output) = run_script(
            "create\nann@example.com\nAnn\nLee\n12\nyes\nann@example.com\nAnn\nLee\n30\nexit\n",
        );

        assert!(output.contains("Error: age must be between 18 and 100, got 12"));
        assert!(output.contains("User ann@example.com successfully created."));
        assert_eq!(repo_for(&dir).list_users().unwrap().len(), 1);
    }

    #[test]
    fn declining_retry_leaves_menu() {
        let (_dir, output) = run_script("get\nghost@example.com\nno\nexit\n");

        assert!(output.contains("Error: user with email ghost@example.com not found"));
        assert!(output.contains("Exiting the user retrieval menu."));
    }

    #[test]
    fn delete_all_requires_confirmation() {
        let (dir, output) = run_script(
            "create\na@example.com\nA\nA\n20\ndelete_all\nmaybe\nn\ndelete_all\ny\n",
        );

        assert!(output.contains("Invalid input. Please enter 'yes' or 'no'."));
        assert!(output.contains("Action canceled."));
        assert!(output.contains("All users have been successfully deleted (1 removed)."));
        assert!(repo_for(&dir).list_users().unwrap().is_empty());
    }

    #[test]
    fn unknown_command_and_eof_exit_cleanly() {
        let (_dir, output) = run_script("frobnicate\n");

        assert!(output.contains("Unsupported command!"));
        assert!(output.ends_with("Exiting\n"));
    }
}
