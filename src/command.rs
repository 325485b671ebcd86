//! One line of interactive input, parsed.

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::wire::InitMethod;

pub const HELP: &str = "\
commands:
  generate [n]     new random dataset (default size from config)
  load <path>      dataset from a TSV file (first two columns)
  reset            clear everything
  method <name>    random | kmeans++ | farthest | manual
  k <n>            cluster count (pick limit in manual mode)
  click <x> <y>    pick a centroid (manual mode)
  init             initialize on the backend
  step             one iteration
  auto             step every period until converged
  stop             stop auto stepping
  converge         run to convergence in one request
  status           show session state
  help             this text
  quit             leave";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Generate(Option<usize>),
    Load(PathBuf),
    Reset,
    Method(InitMethod),
    ClusterCount(usize),
    Click { x: f64, y: f64 },
    Initialize,
    Step,
    AutoStep,
    Stop,
    Converge,
    Status,
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{command}' needs {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("invalid argument '{value}': {reason}")]
    InvalidArgument { value: String, reason: String },
}

fn parse_arg<T: FromStr>(value: &str) -> Result<T, ParseCommandError>
where
    T::Err: ToString,
{
    value.parse().map_err(|e: T::Err| ParseCommandError::InvalidArgument {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_coordinate(value: &str) -> Result<f64, ParseCommandError> {
    let v: f64 = parse_arg(value)?;
    if !v.is_finite() {
        return Err(ParseCommandError::InvalidArgument {
            value: value.to_string(),
            reason: "coordinate must be a finite number".into(),
        });
    }
    Ok(v)
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let head = words.next().ok_or(ParseCommandError::Empty)?;
        let mut need = |command: &'static str, expected: &'static str| {
            words
                .next()
                .ok_or(ParseCommandError::MissingArgument { command, expected })
        };

        let cmd = match head.to_ascii_lowercase().as_str() {
            "generate" | "gen" => match need("generate", "a size") {
                Ok(n) => Command::Generate(Some(parse_arg(n)?)),
                Err(_) => Command::Generate(None),
            },
            "load" => Command::Load(PathBuf::from(need("load", "a path")?)),
            "reset" => Command::Reset,
            "method" => Command::Method(parse_arg(need("method", "an init method")?)?),
            "k" => {
                let k: usize = parse_arg(need("k", "a cluster count")?)?;
                if k == 0 {
                    return Err(ParseCommandError::InvalidArgument {
                        value: "0".into(),
                        reason: "cluster count must be positive".into(),
                    });
                }
                Command::ClusterCount(k)
            }
            "click" => {
                let x = parse_coordinate(need("click", "x and y")?)?;
                let y = parse_coordinate(need("click", "x and y")?)?;
                Command::Click { x, y }
            }
            "init" | "initialize" => Command::Initialize,
            "step" => Command::Step,
            "auto" => Command::AutoStep,
            "stop" => Command::Stop,
            "converge" | "run" => Command::Converge,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(ParseCommandError::Unknown(other.to_string())),
        };
        Ok(cmd)
    }
}
