//! Interactive line-oriented shell over [`AgendaService`].

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use kitty_agenda_app::notice::text;
use kitty_agenda_app::{
    ActionError, AgendaService, AppView, Clock, SessionGateway, StatusNotice, TaskStore,
};
use kitty_agenda_core::{Priority, StatusFilter, TaskDraft, TaskId, parse_due_date};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::render::render;

const PROMPT: &str = "kitty> ";

/// One line typed at the prompt.
#[derive(Parser, Debug)]
#[command(
    name = "kitty-agenda",
    no_binary_name = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
struct ShellLine {
    #[command(subcommand)]
    cmd: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum ShellCommand {
    /// Sign in with email and password.
    Signin { email: String, password: String },

    /// Create an account (signs in right away unless confirmation is required).
    Signup { email: String, password: String },

    /// Sign out.
    Signout,

    /// Create a task.
    Add {
        /// Title words.
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// baja/media/alta (or low/medium/high).
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
        /// Due date as YYYY-MM-DD.
        #[arg(long)]
        due: Option<String>,
    },

    /// Edit a task by list number or id prefix.
    Edit {
        task: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(short, long)]
        priority: Option<Priority>,
        /// New due date as YYYY-MM-DD.
        #[arg(long, conflicts_with = "no_due")]
        due: Option<String>,
        /// Remove the due date.
        #[arg(long)]
        no_due: bool,
    },

    /// Mark a task completed, or active again.
    Toggle { task: String },

    /// Delete a task.
    #[command(alias = "delete")]
    Rm { task: String },

    /// Filter the list: all, active, completed, urgent.
    Filter { filter: StatusFilter },

    /// Search titles and descriptions; no words clears the search.
    Search {
        #[arg(num_args = 0..)]
        words: Vec<String>,
    },

    /// Show the filtered task list.
    List,

    /// Show the dashboard.
    Dashboard,

    /// Reload tasks from the backend.
    Refresh,

    /// Hide the current notice.
    Dismiss,

    /// Show available commands.
    Help,

    /// Leave the agenda.
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Shell-side state: the ids behind the numbers of the last rendered screen.
#[derive(Debug, Default)]
struct Shell {
    numbered: Vec<TaskId>,
}

/// Run the shell until `quit` or end of input.
///
/// # Errors
/// Returns an error when stdin or stdout fail.
pub async fn run<G, S, C>(mut service: AgendaService<G, S, C>) -> Result<()>
where
    G: SessionGateway,
    S: TaskStore,
    C: Clock,
{
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut subscription = service.subscribe();
    let mut session_feed_open = true;
    let mut shell = Shell::default();

    service.bootstrap().await;
    shell.draw(&service, &mut stdout).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                service.expire_notice();
                if shell.execute(&mut service, &line).await == Flow::Quit {
                    break;
                }
                shell.draw(&service, &mut stdout).await?;
            }
            change = subscription.changed(), if session_feed_open => {
                let Some(session) = change else {
                    session_feed_open = false;
                    continue;
                };
                let before = service.state().session().cloned();
                service.apply_session_change(session).await;
                if service.state().session() != before.as_ref() {
                    shell.draw(&service, &mut stdout).await?;
                }
            }
        }
    }

    stdout.write_all("\n¡Hasta pronto! 🎀\n".as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

impl Shell {
    async fn draw<G, S, C>(
        &mut self,
        service: &AgendaService<G, S, C>,
        stdout: &mut tokio::io::Stdout,
    ) -> Result<()>
    where
        G: SessionGateway,
        S: TaskStore,
        C: Clock,
    {
        let screen = render(service.state(), &service.view());
        self.numbered = screen.numbered;
        stdout.write_all(screen.text.as_bytes()).await?;
        stdout.write_all(PROMPT.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }

    async fn execute<G, S, C>(&mut self, service: &mut AgendaService<G, S, C>, line: &str) -> Flow
    where
        G: SessionGateway,
        S: TaskStore,
        C: Clock,
    {
        let command = match parse_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Flow::Continue,
            Err(message) => {
                service.notify(StatusNotice::info(message));
                return Flow::Continue;
            }
        };
        debug!(?command, "Shell command");

        match command {
            ShellCommand::Signin { email, password } => service.sign_in(&email, &password).await,
            ShellCommand::Signup { email, password } => service.sign_up(&email, &password).await,
            ShellCommand::Signout => service.sign_out().await,
            ShellCommand::Add {
                title,
                description,
                priority,
                due,
            } => match parse_due(due.as_deref()) {
                Ok(due_date) => {
                    let draft = TaskDraft {
                        title: title.join(" "),
                        description,
                        priority,
                        due_date,
                    };
                    service.add_task(draft).await;
                }
                Err(err) => reject(service, err),
            },
            ShellCommand::Edit {
                task,
                title,
                description,
                clear_description,
                priority,
                due,
                no_due,
            } => {
                let Some(id) = self.resolve(service, &task) else {
                    return Flow::Continue;
                };
                let Some(mut draft) = service.state().task(id).map(TaskDraft::from_task) else {
                    return Flow::Continue;
                };
                if let Some(title) = title {
                    draft.title = title;
                }
                if clear_description {
                    draft.description = None;
                } else if description.is_some() {
                    draft.description = description;
                }
                if let Some(priority) = priority {
                    draft.priority = priority;
                }
                if no_due {
                    draft.due_date = None;
                } else if due.is_some() {
                    match parse_due(due.as_deref()) {
                        Ok(due_date) => draft.due_date = due_date,
                        Err(err) => {
                            reject(service, err);
                            return Flow::Continue;
                        }
                    }
                }
                service.update_task(id, draft).await;
            }
            ShellCommand::Toggle { task } => {
                if let Some(id) = self.resolve(service, &task) {
                    service.toggle_complete(id).await;
                }
            }
            ShellCommand::Rm { task } => {
                if let Some(id) = self.resolve(service, &task) {
                    service.delete_task(id).await;
                }
            }
            ShellCommand::Filter { filter } => {
                service.set_filter(filter);
                service.set_view(AppView::List);
            }
            ShellCommand::Search { words } => {
                service.set_search(words.join(" "));
                service.set_view(AppView::List);
            }
            ShellCommand::List => service.set_view(AppView::List),
            ShellCommand::Dashboard => service.set_view(AppView::Dashboard),
            ShellCommand::Refresh => service.refresh().await,
            ShellCommand::Dismiss => service.dismiss_notice(),
            ShellCommand::Help => {
                let help = ShellLine::command().render_help().to_string();
                service.notify(StatusNotice::info(help));
            }
            ShellCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Resolve a 1-based list number or a unique id prefix.
    fn resolve<G, S, C>(&self, service: &mut AgendaService<G, S, C>, token: &str) -> Option<TaskId>
    where
        G: SessionGateway,
        S: TaskStore,
        C: Clock,
    {
        let token = token.trim();
        let by_position = token
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| self.numbered.get(index).copied());
        let found = by_position.or_else(|| {
            let prefix = token.to_ascii_lowercase();
            let mut matches = service
                .state()
                .tasks()
                .iter()
                .filter(|task| !prefix.is_empty() && task.id.to_string().starts_with(&prefix));
            match (matches.next(), matches.next()) {
                (Some(task), None) => Some(task.id),
                _ => None,
            }
        });
        if found.is_none() {
            service.notify(StatusNotice::error(text::TASK_MISSING));
        }
        found
    }
}

fn parse_due(raw: Option<&str>) -> Result<Option<time::Date>, ActionError> {
    raw.map_or(Ok(None), |raw| parse_due_date(raw).map_err(ActionError::from))
}

fn reject<G, S, C>(service: &mut AgendaService<G, S, C>, err: ActionError)
where
    G: SessionGateway,
    S: TaskStore,
    C: Clock,
{
    service.notify(StatusNotice::error(err.describe_user_facing()));
}

/// Tokenize and parse a prompt line. `Ok(None)` for blank input; `Err` carries
/// the text to show (usage or parse error).
fn parse_line(line: &str) -> Result<Option<ShellCommand>, String> {
    let words = shell_words::split(line).map_err(|err| format!("No entendí la línea: {err}"))?;
    if words.is_empty() {
        return Ok(None);
    }
    ShellLine::try_parse_from(words)
        .map(|parsed| Some(parsed.cmd))
        .map_err(|err| err.render().to_string())
}
