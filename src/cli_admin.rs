//! Interactive operator console for the user database: create accounts,
//! assign roles, issue confirmation codes, inspect users.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};

mod cli_style;
mod mailer;
mod sqlite_persistence;
mod user;

use cli_style::{get_styles, print_error, print_kv_table, print_ok};
use mailer::LogMailer;
use user::{SqliteUserStore, UserManager, UserPatch, UserRole, UserStore};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to the SQLite user database file.
    #[clap(value_parser = parse_path)]
    pub user_db: PathBuf,
}

#[derive(Parser)]
#[command(styles=get_styles(), name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Creates an active user, bypassing the confirmation flow.
    AddUser {
        username: String,
        email: String,
        /// user, moderator or admin (defaults to user)
        role: Option<String>,
    },

    /// Sets the role of a user.
    SetRole { username: String, role: String },

    /// Issues a fresh confirmation code for a user and prints it.
    /// Any previously issued code stops working.
    IssueCode { username: String },

    /// Activates a user without a confirmation code.
    Activate { username: String },

    /// Shows a user's record and resolved permissions.
    Show { username: String },

    /// Shows all usernames.
    Users,

    /// Shows all available roles and their permissions.
    ListRoles,

    /// Shows the path of the current user db.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";

fn parse_role(role: &str) -> Result<UserRole, String> {
    UserRole::from_str(role)
        .ok_or_else(|| format!("Invalid role '{}'. Valid roles are: user, moderator, admin", role))
}

fn execute_command(
    line: String,
    user_manager: &UserManager,
    user_store: &SqliteUserStore,
    db_path: String,
) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => {
            println!("{} {}", PROMPT, &line);
            match cli.command {
                InnerCommand::AddUser {
                    username,
                    email,
                    role,
                } => {
                    let role = match role.as_deref().map(parse_role).transpose() {
                        Ok(role) => role.unwrap_or(UserRole::User),
                        Err(msg) => return CommandExecutionResult::Error(msg),
                    };
                    match user_manager.create_user(&username, &email, role) {
                        Ok(user_id) => {
                            print_ok(format!("Created user '{}' with id {}", username, user_id))
                        }
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    }
                }
                InnerCommand::SetRole { username, role } => {
                    let role = match parse_role(&role) {
                        Ok(role) => role,
                        Err(msg) => return CommandExecutionResult::Error(msg),
                    };
                    let user = match user_manager.get_user_by_username(&username) {
                        Ok(Some(user)) => user,
                        Ok(None) => {
                            return CommandExecutionResult::Error(format!(
                                "User '{}' not found",
                                username
                            ))
                        }
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    };
                    let patch = UserPatch {
                        role: Some(role),
                        ..Default::default()
                    };
                    if let Err(err) = user_manager.update_user(user.id, &patch) {
                        return CommandExecutionResult::Error(format!("{}", err));
                    }
                    print_ok(format!("Role '{}' set for user '{}'", role.as_str(), username));
                }
                InnerCommand::IssueCode { username } => match user_manager.issue_code(&username) {
                    Ok(code) => {
                        print_ok(format!("Confirmation code for '{}':", username));
                        println!("  {}", code.0);
                    }
                    Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                },
                InnerCommand::Activate { username } => {
                    let user = match user_manager.get_user_by_username(&username) {
                        Ok(Some(user)) => user,
                        Ok(None) => {
                            return CommandExecutionResult::Error(format!(
                                "User '{}' not found",
                                username
                            ))
                        }
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    };
                    if let Err(err) = user_store.activate_user(user.id) {
                        return CommandExecutionResult::Error(format!("{}", err));
                    }
                    print_ok(format!("User '{}' activated", username));
                }
                InnerCommand::Show { username } => {
                    let user = match user_manager.get_user_by_username(&username) {
                        Ok(Some(user)) => user,
                        Ok(None) => {
                            return CommandExecutionResult::Error(format!(
                                "User '{}' not found",
                                username
                            ))
                        }
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    };

                    let permissions = user
                        .permissions()
                        .iter()
                        .map(|p| format!("{:?}", p))
                        .collect::<Vec<_>>()
                        .join(", ");

                    print_kv_table(&[
                        ("id", user.id.to_string()),
                        ("username", user.username.clone()),
                        ("email", user.email.clone()),
                        ("role", user.role.as_str().to_string()),
                        ("active", user.is_active.to_string()),
                        ("superuser", user.is_superuser.to_string()),
                        ("permissions", permissions),
                    ]);
                }
                InnerCommand::Users => match user_manager.list_users(None) {
                    Ok(users) => {
                        for user in users {
                            println!("  {}", user.username);
                        }
                    }
                    Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                },
                InnerCommand::ListRoles => {
                    println!("Available Roles:\n");
                    for role in &[UserRole::User, UserRole::Moderator, UserRole::Admin] {
                        println!("Role: {}", role.as_str());
                        println!("Permissions:");
                        for permission in role.permissions() {
                            println!("  - {:?}", permission);
                        }
                        println!();
                    }
                }
                InnerCommand::Where => {
                    println!("{}", db_path);
                }
                InnerCommand::Exit => return CommandExecutionResult::Exit,
            }
        }

        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
        }
    }
    CommandExecutionResult::Ok
}

#[derive(rustyline_derive::Hinter)]
struct MyHelper {
    commands_names: Vec<String>,
}

impl MyHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        MyHelper { commands_names }
    }
}

impl Completer for MyHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(" ") {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for MyHelper {}
impl Validator for MyHelper {}
impl Helper for MyHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let user_store = Arc::new(SqliteUserStore::new(&cli_args.user_db)?);
    let user_manager = UserManager::new(user_store.clone(), Arc::new(LogMailer));

    InnerCli::command().print_long_help()?;

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<MyHelper, FileHistory>::with_config(config)?;

    let helper = MyHelper::new();
    rl.set_helper(Some(helper));
    let _ = rl.clear_screen();

    loop {
        let readline = rl.readline(PROMPT);

        let _ = rl.clear_screen();
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(
                    line,
                    &user_manager,
                    &user_store,
                    cli_args.user_db.display().to_string(),
                ) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        print_error(format!("Error: {}", err));
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}
