//! Maps a submission's declared language to a concrete toolchain recipe:
//! source filename, optional compile command, run command, and any extra
//! files the toolchain needs alongside the source.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::process::Command as TokioCommand;
use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::error::{ExecError, JudgeError};

/// Languages the engine can judge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageId {
    Javascript,
    Python,
    Python3,
    Java,
    Cpp,
    C,
    Csharp,
}

impl FromStr for LanguageId {
    type Err = JudgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "javascript" => Ok(Self::Javascript),
            "python" => Ok(Self::Python),
            "python3" => Ok(Self::Python3),
            "java" => Ok(Self::Java),
            "cpp" | "c++" => Ok(Self::Cpp),
            "c" => Ok(Self::C),
            "csharp" => Ok(Self::Csharp),
            other => Err(JudgeError::UnsupportedLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Javascript => "javascript",
            Self::Python => "python",
            Self::Python3 => "python3",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::C => "c",
            Self::Csharp => "csharp",
        };
        f.write_str(name)
    }
}

/// One stage of the toolchain pipeline
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Concrete recipe for materializing and running one submission
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    pub source_filename: String,
    /// Files written next to the source (e.g. the C# project descriptor)
    pub extra_files: Vec<(String, String)>,
    /// Compile stage; the run stage only executes if this succeeds
    pub build: Option<ToolCommand>,
    pub run: ToolCommand,
}

impl LanguageProfile {
    pub fn requires_build_step(&self) -> bool {
        self.build.is_some()
    }
}

/// How long a single `--version` probe may take before the candidate is
/// written off
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Resolves which interpreter alias to invoke for python submissions.
///
/// Hosts disagree on whether `python` or `python3` exists; each
/// candidate list is probed at most once (presence on PATH, then a
/// version query) and the winner cached for the resolver's lifetime.
/// Constructed explicitly so tests can substitute fake candidate lists.
#[derive(Debug)]
pub struct InterpreterResolver {
    py3_candidates: Vec<String>,
    py_candidates: Vec<String>,
    py3: OnceCell<String>,
    py: OnceCell<String>,
}

impl Default for InterpreterResolver {
    fn default() -> Self {
        Self::new(
            vec!["python3".into(), "python".into(), "py".into()],
            vec!["python".into(), "python3".into(), "py".into()],
        )
    }
}

impl InterpreterResolver {
    pub fn new(py3_candidates: Vec<String>, py_candidates: Vec<String>) -> Self {
        Self {
            py3_candidates,
            py_candidates,
            py3: OnceCell::new(),
            py: OnceCell::new(),
        }
    }

    /// Interpreter binary for the given language, probing on first use
    pub async fn python(&self, language: LanguageId) -> Result<String, ExecError> {
        let (cell, candidates) = match language {
            LanguageId::Python3 => (&self.py3, &self.py3_candidates),
            _ => (&self.py, &self.py_candidates),
        };
        cell.get_or_try_init(|| Self::probe(candidates))
            .await
            .map(|interpreter| interpreter.clone())
    }

    async fn probe(candidates: &[String]) -> Result<String, ExecError> {
        for candidate in candidates {
            if which::which(candidate).is_err() {
                continue;
            }
            let query = TokioCommand::new(candidate).arg("--version").output();
            match timeout(PROBE_TIMEOUT, query).await {
                Ok(Ok(output)) if output.status.success() => {
                    tracing::debug!(interpreter = %candidate, "resolved python interpreter");
                    return Ok(candidate.clone());
                }
                _ => continue,
            }
        }
        Err(ExecError::InterpreterNotFound("python"))
    }
}

/// Platform-specific naming for a compiled binary: artifact filename and
/// the program used to invoke it from the sandbox directory.
fn binary_names(stem: &str) -> (String, String) {
    if cfg!(windows) {
        let name = format!("{stem}.exe");
        (name.clone(), name)
    } else {
        (stem.to_string(), format!("./{stem}"))
    }
}

/// Find the public class name a java source declares, since the
/// toolchain requires filename/class-name agreement. Defaults to `Main`.
fn detect_java_class(source: &str) -> String {
    for line in source.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("public") {
            continue;
        }
        // Modifiers may sit between `public` and `class`
        let mut token = tokens.next();
        while matches!(
            token,
            Some("final") | Some("abstract") | Some("strictfp") | Some("sealed") | Some("non-sealed")
        ) {
            token = tokens.next();
        }
        if token != Some("class") {
            continue;
        }
        if let Some(name) = tokens.next() {
            let name = name.trim_end_matches('{').trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }
    "Main".to_string()
}

/// Minimal project descriptor so dotnet can build a single source file
const CSHARP_PROJECT: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <OutputType>Exe</OutputType>
    <TargetFramework>net8.0</TargetFramework>
    <Nullable>disable</Nullable>
    <ImplicitUsings>enable</ImplicitUsings>
  </PropertyGroup>
</Project>
"#;

/// Build the toolchain recipe for one submission.
pub async fn resolve_profile(
    language: LanguageId,
    source_code: &str,
    resolver: &InterpreterResolver,
) -> Result<LanguageProfile, ExecError> {
    let profile = match language {
        LanguageId::Javascript => LanguageProfile {
            source_filename: "solution.js".into(),
            extra_files: Vec::new(),
            build: None,
            run: ToolCommand::new("node", &["solution.js"]),
        },
        LanguageId::Python | LanguageId::Python3 => {
            let interpreter = resolver.python(language).await?;
            LanguageProfile {
                source_filename: "solution.py".into(),
                extra_files: Vec::new(),
                build: None,
                run: ToolCommand::new(interpreter, &["solution.py"]),
            }
        }
        LanguageId::Java => {
            let class = detect_java_class(source_code);
            LanguageProfile {
                source_filename: format!("{class}.java"),
                extra_files: Vec::new(),
                build: Some(ToolCommand::new("javac", &[&format!("{class}.java")])),
                run: ToolCommand::new("java", &[&class]),
            }
        }
        LanguageId::Cpp => {
            let (artifact, invocation) = binary_names("solution");
            LanguageProfile {
                source_filename: "solution.cpp".into(),
                extra_files: Vec::new(),
                build: Some(ToolCommand::new(
                    "g++",
                    &["-o", &artifact, "solution.cpp", "-std=c++17", "-O2"],
                )),
                run: ToolCommand::new(invocation, &[]),
            }
        }
        LanguageId::C => {
            let (artifact, invocation) = binary_names("solution");
            LanguageProfile {
                source_filename: "solution.c".into(),
                extra_files: Vec::new(),
                build: Some(ToolCommand::new(
                    "gcc",
                    &["-o", &artifact, "solution.c", "-std=c99", "-O2"],
                )),
                run: ToolCommand::new(invocation, &[]),
            }
        }
        LanguageId::Csharp => LanguageProfile {
            source_filename: "Program.cs".into(),
            extra_files: vec![("solution.csproj".into(), CSHARP_PROJECT.into())],
            build: Some(ToolCommand::new(
                "dotnet",
                &["build", "-nologo", "-v:q", "-c", "Release"],
            )),
            run: ToolCommand::new("dotnet", &["run", "--no-build", "-c", "Release"]),
        },
    };
    Ok(profile)
}

/// Pick the most informative stderr line for a failed run. Advisory
/// only: the message never changes the pass/fail outcome.
pub fn classify_runtime_error(language: LanguageId, stderr: &str) -> String {
    const MAX_MESSAGE_LEN: usize = 400;

    let line = match language {
        LanguageId::Python | LanguageId::Python3 => stderr.lines().rev().find(|line| {
            let head = line.trim().split(':').next().unwrap_or("");
            head.ends_with("Error") || head.ends_with("Exception") || head == "KeyboardInterrupt"
        }),
        LanguageId::Java => stderr
            .lines()
            .find(|line| line.starts_with("Exception in thread") || line.contains("Error:")),
        LanguageId::Javascript => stderr
            .lines()
            .find(|line| line.trim_start().split(':').next().unwrap_or("").ends_with("Error")),
        LanguageId::Cpp | LanguageId::C | LanguageId::Csharp => {
            stderr.lines().find(|line| !line.trim().is_empty())
        }
    };

    let message = match line {
        Some(line) => line.trim().to_string(),
        None if stderr.trim().is_empty() => "Runtime error".to_string(),
        None => stderr.trim().lines().next().unwrap_or("Runtime error").to_string(),
    };

    if message.len() > MAX_MESSAGE_LEN {
        message.chars().take(MAX_MESSAGE_LEN).collect()
    } else {
        message
    }
}

/// Which toolchain binaries are present on this host, per language.
pub fn toolchain_overview() -> Vec<(&'static str, &'static str, bool)> {
    [
        ("javascript", "node"),
        ("python", "python3"),
        ("java", "javac"),
        ("cpp", "g++"),
        ("c", "gcc"),
        ("csharp", "dotnet"),
    ]
    .into_iter()
    .map(|(language, binary)| (language, binary, which::which(binary).is_ok()))
    .collect()
}
