//! Interactive converter session.
//!
//! Reads one command per line, folds the resulting events into the
//! [`ConverterState`] snapshot and re-renders. Rate refreshes arrive through
//! the same event channel, posted by the [`RefreshTask`] or by a manual
//! `refresh`.

use super::ui::{self, StyleType, Theme};
use crate::core::config::AppConfig;
use crate::core::convert::{flag_url, format_amount};
use crate::core::{ConverterState, Event, reduce};
use crate::scheduler::RefreshTask;
use crate::store::RateStore;
use anyhow::{Result, bail};
use comfy_table::Cell;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

const HELP: &str = "\
Commands:
  amount <n> | <n>   set the amount to convert
  from <CODE>        set the source currency
  to <CODE>          set the target currency
  swap               exchange source and target
  refresh            fetch the latest rates now
  theme              toggle dark mode
  list               list the known currency codes
  help               show this help
  quit               leave the session";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Dispatch(Event),
    Refresh,
    List,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Amounts are not validated: anything that is not a number becomes NaN.
fn parse_amount(value: &str) -> f64 {
    value.parse::<f64>().unwrap_or(f64::NAN)
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<SessionCommand>> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    if first.parse::<f64>().is_ok() {
        return Ok(Some(SessionCommand::Dispatch(Event::SetAmount(parse_amount(
            first,
        )))));
    }

    let command = match (first.to_lowercase().as_str(), arg) {
        ("amount" | "a", Some(value)) => SessionCommand::Dispatch(Event::SetAmount(parse_amount(value))),
        ("from" | "f", Some(code)) => SessionCommand::Dispatch(Event::SetSource(code.to_uppercase())),
        ("to" | "t", Some(code)) => SessionCommand::Dispatch(Event::SetTarget(code.to_uppercase())),
        ("amount" | "a", None) => bail!("Usage: amount <value>"),
        ("from" | "f", None) => bail!("Usage: from <CODE>"),
        ("to" | "t", None) => bail!("Usage: to <CODE>"),
        ("swap" | "s", _) => SessionCommand::Dispatch(Event::Swap),
        ("theme" | "dark", _) => SessionCommand::Dispatch(Event::ToggleTheme),
        ("refresh" | "r", _) => SessionCommand::Refresh,
        ("list" | "ls", _) => SessionCommand::List,
        ("help" | "?", _) => SessionCommand::Help,
        ("quit" | "exit" | "q", _) => SessionCommand::Quit,
        (other, _) => bail!("Unknown command: {}. Type 'help' for a list of commands", other),
    };
    Ok(Some(command))
}

/// Renders the full converter view for the current snapshot.
pub fn render(state: &ConverterState, flags_base_url: &str) -> String {
    let theme = Theme::from_dark_mode(state.dark_mode);

    let mut output = format!(
        "{}    [{}]\n\n",
        ui::style_text("Currency Converter", StyleType::Title, theme),
        theme.toggle_label()
    );

    if let Some(error) = &state.error {
        output.push_str(&ui::style_text(error, StyleType::Error, theme));
        output.push_str("\n\n");
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("", theme),
        ui::header_cell("From", theme),
        ui::header_cell("To", theme),
    ]);
    table.add_row(vec![
        Cell::new("Currency"),
        Cell::new(&state.source),
        Cell::new(&state.target),
    ]);
    table.add_row(vec![
        Cell::new("Rate"),
        ui::format_optional_cell(state.rates.get(&state.source), |r| format!("{r:.4}")),
        ui::format_optional_cell(state.rates.get(&state.target), |r| format!("{r:.4}")),
    ]);
    table.add_row(vec![
        Cell::new("Flag"),
        Cell::new(flag_url(flags_base_url, &state.source)),
        Cell::new(flag_url(flags_base_url, &state.target)),
    ]);
    output.push_str(&format!(
        "{}: {}\n",
        ui::style_text("Amount", StyleType::Label, theme),
        state.amount
    ));
    output.push_str(&table.to_string());

    // Zero means nothing has been computed yet. A result left over from an
    // earlier selection is hidden while the current one has no rate.
    if state.result != 0.0 && !state.result.is_nan() && state.has_rates_for_selection() {
        output.push_str(&format!(
            "\n\n{} {} =\n{}",
            state.amount,
            state.source,
            ui::style_text(
                &format!("{} {}", format_amount(state.result), state.target),
                StyleType::Result,
                theme
            )
        ));
    }

    if !state.rates.is_empty() && !state.has_rates_for_selection() {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(
                "No rate known for the selected currencies",
                StyleType::Error,
                theme
            )
        ));
    }

    if state.rates.is_empty() {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text("No exchange rates loaded yet", StyleType::Subtle, theme)
        ));
    } else if let Some(updated) = state.last_updated {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(
                &format!("Rates as of {}", updated.format("%Y-%m-%d %H:%M UTC")),
                StyleType::Subtle,
                theme
            )
        ));
    }

    output
}

pub struct Session {
    state: ConverterState,
    flags_base_url: String,
    store: Arc<RateStore>,
    events: UnboundedSender<Event>,
}

impl Session {
    pub fn new(config: &AppConfig, store: Arc<RateStore>, events: UnboundedSender<Event>) -> Self {
        let defaults = &config.defaults;
        Self {
            state: ConverterState::new(
                defaults.amount,
                &defaults.from,
                &defaults.to,
                defaults.dark_mode,
            ),
            flags_base_url: config.flags.base_url.clone(),
            store,
            events,
        }
    }

    pub fn state(&self) -> &ConverterState {
        &self.state
    }

    pub fn apply(&mut self, event: Event) {
        debug!(?event, "Applying event");
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, event);
    }

    pub fn render(&self) -> String {
        render(&self.state, &self.flags_base_url)
    }

    /// Starts a refresh in the background; its outcome arrives as an event.
    fn request_refresh(&self) -> bool {
        let Some(permit) = self.store.try_acquire() else {
            return false;
        };
        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = store.refresh_with(permit).await;
            let _ = events.send(event);
        });
        true
    }

    pub fn handle<W: Write>(&mut self, command: SessionCommand, out: &mut W) -> Result<Flow> {
        let theme = Theme::from_dark_mode(self.state.dark_mode);
        match command {
            SessionCommand::Dispatch(event) => {
                self.apply(event);
                writeln!(out, "{}", self.render())?;
            }
            SessionCommand::Refresh => {
                let message = if self.request_refresh() {
                    "Refreshing exchange rates..."
                } else {
                    "A refresh is already in progress"
                };
                writeln!(out, "{}", ui::style_text(message, StyleType::Subtle, theme))?;
            }
            SessionCommand::List => {
                let codes: Vec<&str> = self.state.rates.currencies().collect();
                if codes.is_empty() {
                    writeln!(
                        out,
                        "{}",
                        ui::style_text("No exchange rates loaded yet", StyleType::Subtle, theme)
                    )?;
                } else {
                    writeln!(out, "{}", codes.join(" "))?;
                }
            }
            SessionCommand::Help => writeln!(out, "{HELP}")?,
            SessionCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}

/// Drives the session until `quit` or end of input.
pub async fn run_session<R, W>(
    session: &mut Session,
    events: &mut UnboundedReceiver<Event>,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        tokio::select! {
            biased;
            Some(event) = events.recv() => {
                session.apply(event);
                writeln!(out, "{}", session.render())?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("End of input");
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        if session.handle(command, out)? == Flow::Quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let theme = Theme::from_dark_mode(session.state().dark_mode);
                        writeln!(out, "{}", ui::style_text(&e.to_string(), StyleType::Error, theme))?;
                    }
                }
            }
        }
        out.flush()?;
    }
    Ok(())
}

pub async fn run(config: &AppConfig, store: Arc<RateStore>) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let refresh = RefreshTask::spawn(Arc::clone(&store), config.refresh_interval(), tx.clone());

    let mut session = Session::new(config, store, tx);
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}\n", session.render())?;
    writeln!(
        stdout,
        "{}",
        ui::style_text(
            "Type 'help' for a list of commands",
            StyleType::Subtle,
            Theme::from_dark_mode(session.state().dark_mode)
        )
    )?;

    let stdin = BufReader::new(tokio::io::stdin());
    let result = run_session(&mut session, &mut rx, stdin, &mut stdout).await;
    refresh.cancel();
    result
}
