use crate::{Error, Result};

pub const EXECUTE_JOB: &str = "execute-job";
pub const PURGE: &str = "purge";

const USAGE: &str = "usage: execute-job [--serializer <key>] <token> | purge --backend <key>";

/// Worker commands understood by [`crate::cli::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ExecuteJob(ExecuteCommand),
    Purge { backend: String },
}

/// `execute-job --serializer <key> <token>`, the contract between a backend
/// and the worker it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteCommand {
    pub serializer: Option<String>,
    pub token: String,
}

impl ExecuteCommand {
    pub fn new(serializer: &str, token: String) -> Self {
        Self {
            serializer: Some(serializer.to_string()),
            token,
        }
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![EXECUTE_JOB.to_string()];
        if let Some(serializer) = &self.serializer {
            args.push("--serializer".to_string());
            args.push(serializer.clone());
        }
        args.push(self.token.clone());
        args
    }

    /// `program` followed by the command, ready to be spawned.
    pub fn command_line(&self, program: &[String]) -> Vec<String> {
        program.iter().cloned().chain(self.to_args()).collect()
    }
}

impl Command {
    /// Parses the arguments following the program name.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);

        match args.next().as_deref() {
            Some(EXECUTE_JOB) => {
                let mut serializer = None;
                let mut token = None;
                while let Some(arg) = args.next() {
                    match arg.as_str() {
                        "-s" | "--serializer" => serializer = Some(value_of(&arg, args.next())?),
                        _ if arg.starts_with("--serializer=") => {
                            serializer = Some(arg["--serializer=".len()..].to_string())
                        }
                        _ if token.is_none() => token = Some(arg),
                        _ => return Err(usage(&format!("unexpected argument `{}`", arg))),
                    }
                }

                Ok(Command::ExecuteJob(ExecuteCommand {
                    serializer,
                    token: token.ok_or_else(|| usage("missing job token"))?,
                }))
            }
            Some(PURGE) => {
                let mut backend = None;
                while let Some(arg) = args.next() {
                    match arg.as_str() {
                        "-b" | "--backend" => backend = Some(value_of(&arg, args.next())?),
                        _ => return Err(usage(&format!("unexpected argument `{}`", arg))),
                    }
                }

                Ok(Command::Purge {
                    backend: backend.ok_or_else(|| usage("missing --backend"))?,
                })
            }
            Some(other) => Err(usage(&format!("unknown command `{}`", other))),
            None => Err(usage("missing command")),
        }
    }
}

fn value_of(flag: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| usage(&format!("`{}` needs a value", flag)))
}

fn usage(problem: &str) -> Error {
    Error::Configuration(format!("{}\n{}", problem, USAGE))
}
