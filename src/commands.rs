use std::io::{BufRead, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::chat::{AlertOutcome, ChatError, ChatReply, ChatSession};
use crate::config::{Config, ConfigError};
use crate::crypto::Passphrase;
use crate::models::CycleRecord;
use crate::notify::{HttpNotifier, Notifier, NotifyError, Unconfigured};
use crate::screening::{self, Screening, ScreeningError};
use crate::storage::{FileStore, RecordStore, StorageError, PERIOD_DATA_KEY};
use crate::tracker::CycleTracker;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Screening(#[from] ScreeningError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("data is encrypted: pass --passphrase or set FEMCARE_PASSPHRASE")]
    MissingPassphrase,
    #[error("{0}")]
    Aborted(String),
}

pub type Result<T, E = CommandError> = std::result::Result<T, E>;

/// Settings and secrets for one CLI invocation.
pub struct App {
    config: Config,
    data_dir: PathBuf,
    passphrase: Option<Passphrase>,
}

impl App {
    pub fn new(config: Config, data_dir: Option<PathBuf>, passphrase: Option<String>) -> Result<Self> {
        let data_dir = match data_dir.or_else(|| config.storage.data_dir.clone()) {
            Some(dir) => dir,
            None => FileStore::default_dir()?,
        };
        Ok(Self {
            config,
            data_dir,
            passphrase: passphrase.map(Passphrase::new),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn store(&self) -> Result<FileStore> {
        if !self.config.storage.encrypted {
            return Ok(FileStore::plain(&self.data_dir));
        }
        let passphrase = self
            .passphrase
            .clone()
            .ok_or(CommandError::MissingPassphrase)?;
        Ok(FileStore::encrypted(
            &self.data_dir,
            passphrase,
            self.config.storage.kdf_params(),
        ))
    }

    pub fn tracker(&self) -> Result<CycleTracker<FileStore>> {
        Ok(CycleTracker::load(self.store()?)?)
    }

    pub fn notifier(&self) -> Result<Box<dyn Notifier>> {
        let settings = &self.config.notifier;
        let Some(endpoint) = &settings.endpoint else {
            tracing::debug!("no notifier endpoint configured");
            return Ok(Box::new(Unconfigured));
        };
        let mut notifier = HttpNotifier::new(endpoint.clone(), settings.timeout())?;
        if let Some(key) = &settings.api_key {
            notifier = notifier.with_api_key(key.clone());
        }
        Ok(Box::new(notifier))
    }

    pub fn chat_session(&self) -> Result<ChatSession<Box<dyn Notifier>, StdRng>> {
        let chat = &self.config.chat;
        Ok(ChatSession::new(chat.classifier(), self.notifier()?, StdRng::from_entropy())
            .with_policy(chat.notification_policy)
            .with_region(chat.region))
    }
}

/// Toggle each date in turn, then print the resulting summary.
pub fn mark(app: &App, dates: &[NaiveDate], today: NaiveDate, out: &mut impl Write) -> Result<()> {
    let mut tracker = app.tracker()?;
    for &date in dates {
        let marked = tracker.toggle_date(date)?;
        writeln!(out, "{date}: {}", if marked { "marked" } else { "unmarked" })?;
    }
    write_summary(app, &tracker, today, out)
}

pub fn status(app: &App, today: NaiveDate, out: &mut impl Write) -> Result<()> {
    let tracker = app.tracker()?;
    write_summary(app, &tracker, today, out)
}

fn write_summary<S>(
    app: &App,
    tracker: &CycleTracker<S>,
    today: NaiveDate,
    out: &mut impl Write,
) -> Result<()>
where
    S: crate::storage::RecordStore,
{
    let record = tracker.record();
    let Some(last_start) = record.last_period_start else {
        writeln!(out, "No period dates marked yet. Not enough data for a prediction.")?;
        return Ok(());
    };

    let stats = tracker.stats();
    writeln!(out, "Marked days:    {}", record.marked_dates.len())?;
    writeln!(out, "Periods logged: {}", stats.total_episodes)?;
    writeln!(out, "Last period:    {last_start}")?;
    writeln!(
        out,
        "Cycle length:   {} days ({})",
        record.cycle_length_days,
        tracker.cycle_status().label()
    )?;
    if stats.total_episodes < 2 {
        writeln!(out, "                (default, log another period to personalise)")?;
    }
    match record.next_expected_date {
        Some(next) => writeln!(out, "Next expected:  {next}")?,
        None => writeln!(out, "Next expected:  unknown")?,
    }
    if let Some(avg) = stats.avg_period_length {
        writeln!(out, "Period length:  {avg:.1} days on average")?;
    }
    if let (Some(short), Some(long)) = (stats.shortest_cycle, stats.longest_cycle) {
        writeln!(out, "Cycle range:    {short}-{long} days")?;
    }

    if app.config.tracker.show_fertility {
        if let Some(fw) = tracker.fertility_window() {
            writeln!(
                out,
                "Fertile window: {} to {} (ovulation ~{})",
                fw.fertile_start, fw.fertile_end, fw.ovulation_day
            )?;
        }
    }

    if let Some(reminder) = tracker.stock_reminder(today) {
        if reminder.due {
            writeln!(
                out,
                "Your next period is expected in {} days. Your menstrual stock may be low for the upcoming cycle.",
                reminder.days_until_next
            )?;
        }
    }
    Ok(())
}

pub async fn chat_once<N, R>(
    session: &mut ChatSession<N, R>,
    message: &str,
    out: &mut impl Write,
) -> Result<ChatReply>
where
    N: Notifier,
    R: rand::Rng,
{
    let reply = session.handle_message(message).await?;
    write_reply(&reply, out)?;
    Ok(reply)
}

/// One message from the command line. Nobody is left to answer a consent
/// question, so a held alert is dropped and the user is pointed at the
/// interactive session instead.
pub async fn chat_single<N, R>(
    session: &mut ChatSession<N, R>,
    message: &str,
    out: &mut impl Write,
) -> Result<()>
where
    N: Notifier,
    R: rand::Rng,
{
    let reply = session.handle_message(message).await?;
    writeln!(out, "{}", reply.text)?;
    match reply.alert {
        Some(AlertOutcome::AwaitingConsent) => {
            session.decline_alert()?;
            writeln!(
                out,
                "To let your guardian know, run `femcare chat` and answer yes when asked."
            )?;
        }
        Some(outcome) => write_outcome(outcome, out)?,
        None => {}
    }
    Ok(())
}

/// Read messages line by line until EOF or `exit`. Under the ask-first
/// policy the line after a crisis reply answers the consent question.
pub async fn chat_interactive<N, R>(
    session: &mut ChatSession<N, R>,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<()>
where
    N: Notifier,
    R: rand::Rng,
{
    if let Some(welcome) = session.transcript().first() {
        writeln!(out, "{}", welcome.text)?;
    }

    for line in input.lines() {
        let line = line?;
        let line = line.trim();

        if session.pending_alert().is_some() {
            let outcome = if matches!(line.to_lowercase().as_str(), "y" | "yes") {
                session.confirm_alert().await?
            } else {
                session.decline_alert()?
            };
            write_outcome(outcome, out)?;
            continue;
        }

        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }
        chat_once(session, line, out).await?;
    }
    Ok(())
}

fn write_reply(reply: &ChatReply, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", reply.text)?;
    if let Some(outcome) = reply.alert {
        write_outcome(outcome, out)?;
    }
    Ok(())
}

fn write_outcome(outcome: AlertOutcome, out: &mut impl Write) -> Result<()> {
    if let Some(notice) = outcome.notice() {
        writeln!(out, "{notice}")?;
    }
    Ok(())
}

pub fn screen(answers: &[bool], out: &mut impl Write) -> Result<()> {
    let result = Screening::from_answers(answers)?.result()?;
    writeln!(out, "{:?} indication", result.indication)?;
    writeln!(
        out,
        "You answered yes to {} of {} questions.",
        result.yes_count, result.total
    )?;
    writeln!(out, "{}", result.indication.guidance())?;
    writeln!(out, "{}", screening::DISCLAIMER)?;
    Ok(())
}

pub fn export(app: &App, out: &mut impl Write) -> Result<()> {
    let tracker = app.tracker()?;
    let record: &CycleRecord = tracker.record();
    serde_json::to_writer_pretty(&mut *out, record)?;
    writeln!(out)?;
    Ok(())
}

pub fn wipe(app: &App, confirmed: bool, out: &mut impl Write) -> Result<()> {
    if !confirmed {
        return Err(CommandError::Aborted(
            "refusing to delete all data without --yes".into(),
        ));
    }
    // No passphrase needed: a forgotten passphrase or a corrupted file must
    // still be deletable.
    FileStore::plain(&app.data_dir).remove(PERIOD_DATA_KEY)?;
    tracing::warn!(dir = %app.data_dir.display(), "cycle record wiped");
    writeln!(out, "All period data deleted.")?;
    Ok(())
}
