//!
//! src/shell.rs
//!
//! Line oriented front end over the application controller. Reads
//! commands from any `BufRead` and writes to any `Write`, so the same
//! loop drives a terminal and the tests.
//!

use std::io::{BufRead, Write};

use tracing::error;

use crate::controller::{AppController, Confirmation, Outcome};
use crate::errors::CatalogError;
use crate::form::{FormField, TrackForm};
use crate::types::{SortKey, Track, TrackId};

const HELP: &str = "\
commands:
  list [created|record|artist|bpm|modified]   show the catalogue
  show <id>                                    show every field of a track
  add                                          add a track
  edit <id>                                    edit a track
  delete <id>                                  delete a track
  yes | no                                     answer a pending question
  help                                         this text
  quit                                         leave";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    List(Option<SortKey>),
    Show(TrackId),
    Add,
    Edit(TrackId),
    Delete(TrackId),
    Yes,
    No,
    Help,
    Quit,
}

impl Command {
    /// `Ok(None)` for a blank line, `Err` carries a message for the user
    fn parse(line: &str) -> Result<Option<Command>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let id = |arg: Option<&str>| -> Result<TrackId, String> {
            let arg = arg.ok_or_else(|| format!("{verb} needs a track id"))?;
            arg.parse::<TrackId>().map_err(|e| e.to_string())
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "list" | "ls" => match arg {
                None => Command::List(None),
                Some(key) => Command::List(Some(
                    SortKey::parse(key).ok_or_else(|| format!("unknown sort order: {key}"))?
                )),
            },
            "show"           => Command::Show(id(arg)?),
            "add" | "new"    => Command::Add,
            "edit"           => Command::Edit(id(arg)?),
            "delete" | "rm"  => Command::Delete(id(arg)?),
            "yes" | "y"      => Command::Yes,
            "no" | "n"       => Command::No,
            "help" | "?"     => Command::Help,
            "quit" | "exit"  => Command::Quit,
            other => return Err(format!("unknown command: {other} (try help)")),
        };
        Ok(Some(command))
    }
}

pub struct Shell<R, W> {
    controller: AppController,
    input: R,
    output: W,
    sort: SortKey,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(controller: AppController, input: R, output: W, sort: SortKey) -> Self {
        Self { controller, input, output, sort }
    }

    #[cfg(test)]
    pub fn into_parts(self) -> (AppController, W) {
        (self.controller, self.output)
    }

    /// Runs until `quit` or end of input
    pub fn run(&mut self) -> Result<(), CatalogError> {
        self.print_list()?;
        while let Some(line) = self.prompt("> ")? {
            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(msg) => {
                    writeln!(self.output, "{msg}")?;
                    continue;
                }
            };
            if command == Command::Quit {
                break;
            }
            self.execute(command)?;
        }
        if let Confirmation::Pending(_) = self.controller.confirmation() {
            writeln!(self.output, "unanswered question dropped, nothing was changed")?;
        }
        self.output.flush()?;
        Ok(())
    }

    fn execute(&mut self, command: Command) -> Result<(), CatalogError> {
        match command {
            Command::List(sort) => {
                if let Some(sort) = sort {
                    self.sort = sort;
                }
                self.print_list()?;
            }
            Command::Show(id) => match self.controller.store().get(id) {
                Some(track) => {
                    let details = describe(track);
                    write!(self.output, "{details}")?;
                }
                None => writeln!(self.output, "track {id} not found")?,
            },
            Command::Add => {
                let mut form = self.controller.open_add();
                if self.fill_form(&mut form, false)? {
                    let result = self.controller.submit_new(form);
                    self.report(result)?;
                } else {
                    self.controller.close_form();
                }
            }
            Command::Edit(id) => {
                let Some(mut form) = self.controller.open_edit(id) else {
                    writeln!(self.output, "track {id} not found")?;
                    return Ok(());
                };
                writeln!(self.output, "enter keeps a value, - clears it")?;
                if self.fill_form(&mut form, true)? {
                    let outcome = self.controller.submit_edit(form);
                    self.report(Ok(outcome))?;
                } else {
                    self.controller.close_form();
                }
            }
            Command::Delete(id) => {
                let outcome = self.controller.request_delete(id);
                self.report(Ok(outcome))?;
            }
            Command::Yes => {
                let result = self.controller.confirm();
                self.report(result)?;
            }
            Command::No => {
                let outcome = self.controller.cancel();
                self.report(Ok(outcome))?;
            }
            Command::Help => writeln!(self.output, "{HELP}")?,
            Command::Quit => {}
        }
        Ok(())
    }

    /// Asks for every field in turn; false when input ran out
    fn fill_form(&mut self, form: &mut TrackForm, editing: bool) -> Result<bool, CatalogError> {
        for field in FormField::ALL {
            let label = if editing {
                format!("{} [{}]: ", field.label(), form.field(field))
            } else {
                format!("{}: ", field.label())
            };
            let Some(answer) = self.prompt(&label)? else {
                return Ok(false);
            };
            if editing && answer == "-" {
                form.field_mut(field).clear();
            } else if !editing || !answer.is_empty() {
                *form.field_mut(field) = answer;
            }
        }
        Ok(true)
    }

    fn report(&mut self, result: Result<Outcome, CatalogError>) -> Result<(), CatalogError> {
        match result {
            Ok(Outcome::Refresh { id }) => {
                writeln!(self.output, "done: track {id}")?;
                self.print_list()?;
            }
            Ok(Outcome::AwaitingConfirmation(question)) => {
                writeln!(self.output, "{question} (yes/no)")?;
            }
            Ok(Outcome::Cancelled) => writeln!(self.output, "cancelled")?,
            Ok(Outcome::Notice(msg)) => writeln!(self.output, "{msg}")?,
            Err(e) => {
                error!(error = %e, "shell.command.failed");
                writeln!(self.output, "error: {e}")?;
            }
        }
        Ok(())
    }

    fn print_list(&mut self) -> Result<(), CatalogError> {
        let entries = self.controller.entries(self.sort);
        if entries.is_empty() {
            writeln!(self.output, "(no tracks)")?;
        }
        for entry in entries {
            writeln!(self.output, "[{}] {}", entry.id, entry.primary)?;
            writeln!(self.output, "    {}", entry.secondary)?;
        }
        Ok(())
    }

    fn prompt(&mut self, text: &str) -> Result<Option<String>, CatalogError> {
        write!(self.output, "{text}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

fn describe(track: &Track) -> String {
    let f = &track.fields;
    let changed = chrono::DateTime::from_timestamp(track.last_change, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| track.last_change.to_string());

    let rows = [
        ("id", track.id.to_string()),
        ("record", f.record.clone()),
        ("number", f.num.clone()),
        ("track", f.track.clone()),
        ("artist", f.artist.clone()),
        ("style", f.style.join(", ")),
        ("bpm", f.bpm.clone()),
        ("key", f.key.clone()),
        ("power", f.power.clone()),
        ("rpm", f.rpm.clone()),
        ("comment", f.comment.clone()),
        ("changed", changed),
    ];
    rows.iter()
        .map(|(name, value)| format!("{name:<8} {value}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;
    use crate::ids::{ManualClock, TimestampIds};
    use crate::persistent::TrackStore;

    const T0: i64 = 1_697_040_000;

    fn run_script(
        dir: &tempfile::TempDir,
        clock: &ManualClock,
        script: &str,
    ) -> Result<(AppController, String), CatalogError> {
        let cfg = CatalogConfig {
            path: dir.path().join("Records.json"),
            create_if_missing: true,
            ..Default::default()
        };
        let store = TrackStore::init(
            &cfg, Box::new(clock.clone()), Box::new(TimestampIds::default()))?;
        let mut shell = Shell::new(
            AppController::new(store), script.as_bytes(), Vec::new(), SortKey::Created);
        shell.run()?;
        let (controller, output) = shell.into_parts();
        Ok((controller, String::from_utf8_lossy(&output).into_owned()))
    }

    const ADD_ABBEY_ROAD: &str = "add\nAbbey Road\n1\nCome Together\nThe Beatles\n\
        Rock\n\n\n82\nDm\n\n\n\n";

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("  "), Ok(None));
        assert_eq!(Command::parse("list bpm"), Ok(Some(Command::List(Some(SortKey::Bpm)))));
        assert_eq!(Command::parse("DELETE 12"), Ok(Some(Command::Delete(TrackId(12)))));
        assert_eq!(Command::parse("y"), Ok(Some(Command::Yes)));
        assert!(Command::parse("edit").is_err());
        assert!(Command::parse("edit twelve").is_err());
        assert!(Command::parse("list colour").is_err());
        assert!(Command::parse("dance").is_err());
    }

    #[test]
    fn add_prints_the_refreshed_list() -> Result<(), CatalogError> {
        let dir = tempfile::tempdir()?;
        let script = format!("{ADD_ABBEY_ROAD}quit\n");
        let (app, out) = run_script(&dir, &ManualClock::at(T0), &script)?;

        assert!(out.starts_with("(no tracks)"), "{out}");
        assert!(out.contains(&format!("done: track {T0}")), "{out}");
        assert!(out.contains("Abbey Road - 1. Come Together"), "{out}");
        assert!(out.contains("The Beatles, Rock, BPM=82"), "{out}");

        let track = app.store().get(TrackId(T0)).expect("added");
        assert_eq!(track.fields.style, vec!["Rock".to_string()]);
        assert_eq!(track.fields.key, "Dm");
        Ok(())
    }

    #[test]
    fn edit_keeps_and_clears_values_after_confirmation() -> Result<(), CatalogError> {
        let dir = tempfile::tempdir()?;
        let script = format!(
            "{ADD_ABBEY_ROAD}edit {T0}\n\n\nSomething\n\n-\nBallad\n\n\n\n\n\n\nyes\nshow {T0}\n"
        );
        let (app, out) = run_script(&dir, &ManualClock::at(T0), &script)?;

        assert!(out.contains("save changes to \"Abbey Road - Come Together\"? (yes/no)"), "{out}");
        let track = app.store().get(TrackId(T0)).expect("still stored");
        assert_eq!(track.fields.track, "Something");
        assert_eq!(track.fields.style, vec!["Ballad".to_string()]);
        assert_eq!(track.fields.bpm, "82");
        assert!(out.contains("changed  2023-10-11 16:00:00 UTC"), "{out}");
        Ok(())
    }

    #[test]
    fn delete_asks_first() -> Result<(), CatalogError> {
        let dir = tempfile::tempdir()?;
        let script = format!("{ADD_ABBEY_ROAD}delete {T0}\nno\ndelete {T0}\nyes\ndelete {T0}\n");
        let (app, out) = run_script(&dir, &ManualClock::at(T0), &script)?;

        assert!(out.contains("delete \"Abbey Road - Come Together\"? (yes/no)"), "{out}");
        assert!(out.contains("cancelled"), "{out}");
        assert!(out.contains(&format!("track {T0} no longer exists")), "{out}");
        assert!(app.store().is_empty());
        Ok(())
    }

    #[test]
    fn input_ending_mid_form_adds_nothing() -> Result<(), CatalogError> {
        let dir = tempfile::tempdir()?;
        let (app, out) = run_script(&dir, &ManualClock::at(T0), "add\nHalf\n")?;
        assert!(app.store().is_empty());
        assert!(out.contains("track number: "), "{out}");
        Ok(())
    }

    #[test]
    fn unknown_commands_and_ids_are_reported() -> Result<(), CatalogError> {
        let dir = tempfile::tempdir()?;
        let (_, out) = run_script(&dir, &ManualClock::at(T0), "dance\nshow 5\nedit 5\nyes\n")?;
        assert!(out.contains("unknown command: dance"), "{out}");
        assert!(out.contains("track 5 not found"), "{out}");
        assert!(out.contains("nothing to confirm"), "{out}");
        Ok(())
    }
}
