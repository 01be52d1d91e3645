//! Interactive terminal front end.
//!
//! The terminal plays the browser: redirects are printed (and opened in
//! the system browser), the user pastes back the callback URL, and the
//! items view is driven by typed commands. The items route is followed
//! through a [`GuardWatch`], so a session that ends in the background is
//! reported at the prompt.

use std::fmt::Write as _;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;
use warden_application::{GuardWatch, ItemsView, ViewStatus};
use warden_domain::{GuardDecision, Item, ItemDraft, ItemId};

use crate::app::{App, AppError, ITEMS_ROUTE, Navigation};

const HELP: &str = "\
commands:
  open <uri>              visit a route (or paste the callback URL)
  list                    show the items
  show <id>               show one item
  add <name> | <desc>     create an item
  edit <id> <name> | <desc>
                          replace an item
  rm <id>                 delete an item
  status                  show the session
  login                   start sign-in
  logout                  sign out
  quit";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Visit a URI.
    Open(String),
    /// Reload the list.
    List,
    /// Fetch one item.
    Show(ItemId),
    /// Create an item.
    Add(ItemDraft),
    /// Replace an item.
    Edit(ItemId, ItemDraft),
    /// Delete an item.
    Remove(ItemId),
    /// Print the session.
    Status,
    /// Start sign-in.
    SignIn,
    /// Sign out.
    SignOut,
    /// Print the command list.
    Help,
    /// Leave.
    Quit,
}

impl Command {
    /// Parses one input line.
    ///
    /// A bare URL or path is treated as `open`.
    ///
    /// # Errors
    ///
    /// Returns a usage message for unknown or incomplete commands.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if line.starts_with('/') || line.starts_with("http://") || line.starts_with("https://") {
            return Ok(Self::Open(line.to_string()));
        }

        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        match word {
            "open" if !rest.is_empty() => Ok(Self::Open(rest.to_string())),
            "list" | "ls" => Ok(Self::List),
            "show" if !rest.is_empty() => Ok(Self::Show(ItemId::new(rest))),
            "add" if !rest.is_empty() => Ok(Self::Add(parse_draft(rest))),
            "edit" => {
                let (id, draft) = rest
                    .split_once(' ')
                    .ok_or_else(|| "usage: edit <id> <name> | <desc>".to_string())?;
                Ok(Self::Edit(ItemId::new(id), parse_draft(draft)))
            }
            "rm" | "delete" if !rest.is_empty() => Ok(Self::Remove(ItemId::new(rest))),
            "status" => Ok(Self::Status),
            "login" => Ok(Self::SignIn),
            "logout" => Ok(Self::SignOut),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(format!("unknown command {line:?}, try help")),
        }
    }
}

fn parse_draft(input: &str) -> ItemDraft {
    let (name, description) = input.split_once('|').unwrap_or((input, ""));
    ItemDraft::new(name.trim(), description.trim())
}

/// Reads commands from `input` until `quit` or end of input.
pub struct Shell<'a> {
    app: &'a App,
    view: ItemsView,
    route: GuardWatch,
}

impl<'a> Shell<'a> {
    /// Creates a shell over a started app.
    #[must_use]
    pub fn new(app: &'a App) -> Self {
        Self {
            view: app.items_view(),
            route: app.guard().watch(ITEMS_ROUTE),
            app,
        }
    }

    /// Runs the read-eval-print loop.
    ///
    /// # Errors
    ///
    /// Returns an error only if the terminal cannot be read or written.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> Result<(), AppError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let opening = self.execute(Command::Open(ITEMS_ROUTE.to_string())).await;
        self.route.acknowledge();
        write_block(&mut output, &opening).await?;

        let mut lines = input.lines();
        loop {
            output.write_all(b"warden> ").await?;
            output.flush().await?;

            let reply = tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let reply = match Command::parse(&line) {
                        Ok(Command::Quit) => break,
                        Ok(command) => self.execute(command).await,
                        Err(usage) => usage,
                    };
                    self.route.acknowledge();
                    reply
                }
                Some(decision) = self.route.changed() => self.session_notice(decision),
            };
            write_block(&mut output, &reply).await?;
        }
        Ok(())
    }

    /// Executes one command and returns the text to print.
    pub async fn execute(&mut self, command: Command) -> String {
        match command {
            Command::Open(uri) => self.open(&uri).await,
            Command::List => {
                if let Some(blocked) = self.admit() {
                    return blocked;
                }
                self.view.mount().await;
                self.render()
            }
            Command::Show(id) => {
                if let Some(blocked) = self.admit() {
                    return blocked;
                }
                match self.app.client().get(&id).await {
                    Ok(item) => format_item(&item),
                    Err(error) => format!("error: {error}"),
                }
            }
            Command::Add(draft) => {
                if let Some(blocked) = self.admit() {
                    return blocked;
                }
                self.view.set_name(draft.name);
                self.view.set_description(draft.description);
                self.view.submit().await;
                self.render()
            }
            Command::Edit(id, draft) => {
                if let Some(blocked) = self.admit() {
                    return blocked;
                }
                match self.app.client().update(&id, &draft).await {
                    Ok(()) => format_items(&self.view.items()),
                    Err(error) => format!("error: {error}"),
                }
            }
            Command::Remove(id) => {
                if let Some(blocked) = self.admit() {
                    return blocked;
                }
                self.view.delete(&id).await;
                self.render()
            }
            Command::Status => self.status().await,
            Command::SignIn => match self.app.session().sign_in() {
                Ok(()) => self.redirect_hint(),
                Err(error) => format!("error: {error}"),
            },
            Command::SignOut => match self.app.sign_out().await {
                Ok(()) => "signed out".to_string(),
                Err(error) => {
                    warn!(%error, "sign-out incomplete at the provider");
                    format!("signed out locally; {error}")
                }
            },
            Command::Help => HELP.to_string(),
            Command::Quit => String::new(),
        }
    }

    async fn open(&mut self, uri: &str) -> String {
        match self.app.navigate(uri).await {
            Ok(Navigation::SignedIn { location }) => {
                let mut reply = format!("signed in, back at {location}");
                if location.starts_with(ITEMS_ROUTE) {
                    self.view.mount().await;
                    let _ = write!(reply, "\n{}", self.render());
                }
                reply
            }
            Ok(Navigation::Route(decision)) => match decision {
                GuardDecision::Loading => "checking session...".to_string(),
                GuardDecision::RedirectToSignIn => self.redirect_hint(),
                GuardDecision::Render if uri.starts_with(ITEMS_ROUTE) => {
                    self.view.mount().await;
                    self.render()
                }
                GuardDecision::Render => format!("at {uri}"),
            },
            Err(error) => format!("sign-in failed: {error}"),
        }
    }

    /// Runs the guard for the items route; `Some` carries the refusal text.
    fn admit(&mut self) -> Option<String> {
        match self.route.current() {
            GuardDecision::Render => None,
            GuardDecision::Loading => Some("checking session...".to_string()),
            GuardDecision::RedirectToSignIn => Some(self.redirect_hint()),
        }
    }

    fn render(&mut self) -> String {
        match self.view.status() {
            ViewStatus::Ready => format_items(&self.view.items()),
            ViewStatus::Failed { message } => format!("error: {message}"),
            ViewStatus::SignInRequired => {
                // Re-evaluating the route starts sign-in.
                self.route.current();
                format!("session expired\n{}", self.redirect_hint())
            }
        }
    }

    /// Text for a session transition the shell did not cause.
    fn session_notice(&self, decision: GuardDecision) -> String {
        match decision {
            GuardDecision::Render => "signed in".to_string(),
            GuardDecision::Loading => "checking session...".to_string(),
            GuardDecision::RedirectToSignIn => {
                format!("session ended\n{}", self.redirect_hint())
            }
        }
    }

    fn redirect_hint(&self) -> String {
        self.app.navigator().last_redirect().map_or_else(
            || "sign-in required".to_string(),
            |url| format!("sign in at:\n  {url}\nthen paste the URL your browser lands on"),
        )
    }

    async fn status(&self) -> String {
        let session = self.app.session().get_state();
        let mut reply = session.state().message().to_string();
        if let Some(subject) = session.credential().and_then(|c| c.subject()) {
            let _ = write!(reply, " as {subject}");
        }
        let token = self.app.session().token_status().await;
        let _ = write!(reply, "\ntoken: {}", token.display_message());
        reply
    }
}

fn format_item(item: &Item) -> String {
    if item.description.is_empty() {
        format!("{}\t{}", item.id, item.name)
    } else {
        format!("{}\t{}\t{}", item.id, item.name, item.description)
    }
}

fn format_items(items: &[Item]) -> String {
    if items.is_empty() {
        return "(no items)".to_string();
    }
    items.iter().map(format_item).collect::<Vec<_>>().join("\n")
}

async fn write_block<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
