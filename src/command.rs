use thiserror::Error;

use crate::onboard::{ExperiencePatch, MonthDate};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Summary(String),
    Name(String),
    AddExperience,
    RemoveExperience(usize),
    SetExperience { index: usize, patch: ExperiencePatch },
    AddSkill(String),
    RemoveSkill(String),
    Next,
    Back,
    Finish,
    Show,
    Inbox,
    Read(ReadTarget),
    Clear,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadTarget {
    All,
    One(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Missing {0}")]
    MissingArgument(&'static str),

    #[error("Invalid {what}: {value}")]
    InvalidArgument { what: &'static str, value: String },
}

pub const HELP: &str = "\
summary <text>              set the professional summary
name <text>                 set the full name (when not provided at sign-in)
exp add                     add an empty experience
exp rm <n>                  remove experience n
exp set <n> <field> <value> field: title, company, description, start, end, current
skill add <skill>           add a skill
skill rm <skill>            remove a skill
next | back                 save and move between steps
finish                      create the profile
show                        print the current state
inbox | read <id>|all       notifications
clear                       clear the error banner
help | quit";

fn split_word(input: &str) -> (&str, Option<&str>) {
    let mut parts = input.trim().splitn(2, ' ');
    let word = parts.next().unwrap_or("");
    let rest = parts.next().map(str::trim).filter(|s| !s.is_empty());
    (word, rest)
}

fn required<'a>(arg: Option<&'a str>, what: &'static str) -> Result<&'a str, CommandError> {
    arg.ok_or(CommandError::MissingArgument(what))
}

fn index(arg: Option<&str>) -> Result<usize, CommandError> {
    let raw = required(arg, "experience number")?;
    raw.parse().map_err(|_| CommandError::InvalidArgument {
        what: "experience number",
        value: raw.to_string(),
    })
}

/// `-` or `none` clears a date
fn month(value: &str) -> Result<Option<MonthDate>, CommandError> {
    if value == "-" || value == "none" {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| CommandError::InvalidArgument {
            what: "month (YYYY-MM)",
            value: value.to_string(),
        })
}

fn experience_patch(field: &str, value: &str) -> Result<ExperiencePatch, CommandError> {
    let mut patch = ExperiencePatch::default();
    match field {
        "title" | "role" => patch.job_title = Some(value.to_string()),
        "company" => patch.company = Some(value.to_string()),
        "description" | "desc" => patch.description = Some(value.to_string()),
        "start" => patch.start_date = Some(month(value)?),
        "end" => patch.end_date = Some(month(value)?),
        "current" => {
            patch.is_current = Some(match value {
                "yes" | "on" | "true" => true,
                "no" | "off" | "false" => false,
                other => {
                    return Err(CommandError::InvalidArgument {
                        what: "current flag",
                        value: other.to_string(),
                    });
                }
            })
        }
        other => {
            return Err(CommandError::InvalidArgument {
                what: "experience field",
                value: other.to_string(),
            });
        }
    }
    Ok(patch)
}

fn parse_experience(arg: Option<&str>) -> Result<Command, CommandError> {
    let (sub, rest) = split_word(required(arg, "exp subcommand")?);
    match sub {
        "add" => Ok(Command::AddExperience),
        "rm" | "remove" => Ok(Command::RemoveExperience(index(rest)?)),
        "set" => {
            let (n, rest) = split_word(required(rest, "experience number")?);
            let index = index(Some(n))?;
            let (field, value) = split_word(required(rest, "experience field")?);
            let value = required(value, "value")?;
            Ok(Command::SetExperience {
                index,
                patch: experience_patch(field, value)?,
            })
        }
        other => Err(CommandError::Unknown(format!("exp {other}"))),
    }
}

fn parse_skill(arg: Option<&str>) -> Result<Command, CommandError> {
    let (sub, rest) = split_word(required(arg, "skill subcommand")?);
    match sub {
        "add" => Ok(Command::AddSkill(required(rest, "skill")?.to_string())),
        "rm" | "remove" => Ok(Command::RemoveSkill(required(rest, "skill")?.to_string())),
        other => Err(CommandError::Unknown(format!("skill {other}"))),
    }
}

pub fn parse_command(input: &str) -> Result<Command, CommandError> {
    let (cmd, arg) = split_word(input);

    match cmd {
        "summary" => Ok(Command::Summary(required(arg, "summary text")?.to_string())),
        "name" => Ok(Command::Name(required(arg, "name")?.to_string())),
        "exp" | "e" => parse_experience(arg),
        "skill" | "sk" => parse_skill(arg),
        "next" | "n" => Ok(Command::Next),
        "back" | "b" => Ok(Command::Back),
        "finish" | "f" => Ok(Command::Finish),
        "show" | "s" => Ok(Command::Show),
        "inbox" | "i" => Ok(Command::Inbox),
        "read" | "r" => match required(arg, "notification id")? {
            "all" => Ok(Command::Read(ReadTarget::All)),
            id => Ok(Command::Read(ReadTarget::One(id.to_string()))),
        },
        "clear" | "c" => Ok(Command::Clear),
        "help" | "h" | "?" => Ok(Command::Help),
        "q" | "quit" | "exit" => Ok(Command::Quit),
        "" => Err(CommandError::Unknown("empty command".to_string())),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}
