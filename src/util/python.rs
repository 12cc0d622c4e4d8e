//! Interpreter header probing.
//!
//! The extensions need the NumPy and Python C headers. When they are not
//! configured, the interpreter that will import the modules is asked.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::util::process::ProcessBuilder;

/// Default interpreter name.
pub fn default_python() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

const PROBE_SCRIPT: &str =
    "import numpy, sysconfig; print(numpy.get_include()); print(sysconfig.get_paths()['include'])";

/// Header directories reported by an interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedHeaders {
    pub array_include: PathBuf,
    pub python_include: Option<PathBuf>,
}

/// Ask `python` for its NumPy and Python include directories.
pub fn probe_headers(python: &str) -> Result<ProbedHeaders> {
    let output = ProcessBuilder::new(python)
        .arg("-c")
        .arg(PROBE_SCRIPT)
        .exec_and_check()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let headers = parse_probe_output(&stdout)?;
    tracing::debug!(
        "{} reports NumPy headers at {}",
        python,
        headers.array_include.display()
    );
    Ok(headers)
}

fn parse_probe_output(stdout: &str) -> Result<ProbedHeaders> {
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());

    let Some(array_include) = lines.next() else {
        bail!("interpreter printed no include directory");
    };

    Ok(ProbedHeaders {
        array_include: PathBuf::from(array_include),
        python_include: lines.next().map(PathBuf::from),
    })
}
