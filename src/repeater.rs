//! Bounded repeater: append copies of a file's first line to the file until
//! the repetition count runs out or the next copy would push the file past
//! its size ceiling. Overflow truncates the file to zero bytes.
use crate::store::FileStore;
use std::path::{Path, PathBuf};

/// Validated invocation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatParams {
    pub path: PathBuf,
    pub repetitions: u64,
    pub max_size: u64,
}

/// Result of a run that stayed within the bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatOutcome {
    pub initial_size: u64,
    pub unit_size: u64,
    pub appended: u64,
    pub final_size: u64,
}

/// What a run would do, computed without touching the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepeatPlan {
    /// Every repetition fits; the file would end at `final_size` bytes.
    Fits { unit_size: u64, final_size: u64 },
    /// Repetition `step` (1-based) would overflow the bound.
    Overflows {
        unit_size: u64,
        step: u64,
        current_size: u64,
    },
}

/// Filesystem step that failed, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Stat,
    Read,
    Append,
    Truncate,
}

impl std::fmt::Display for IoOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IoOp::Stat => "stat",
            IoOp::Read => "read",
            IoOp::Append => "append to",
            IoOp::Truncate => "truncate",
        };
        f.write_str(name)
    }
}

/// Errors that end a repeat run.
#[derive(Debug)]
pub enum RepeatError {
    /// The file is missing, unreadable, not UTF-8, or a write failed.
    Io {
        path: PathBuf,
        op: IoOp,
        source: std::io::Error,
    },
    /// The file had no bytes at start, so there is no line to repeat.
    EmptyFile { path: PathBuf },
    /// Appending repetition `step` would have exceeded `max_size`.
    /// The file has been truncated to zero bytes.
    SizeBoundExceeded {
        path: PathBuf,
        step: u64,
        current_size: u64,
        unit_size: u64,
        max_size: u64,
    },
}

impl RepeatError {
    fn io(path: &Path, op: IoOp, source: std::io::Error) -> Self {
        RepeatError::Io {
            path: path.to_path_buf(),
            op,
            source,
        }
    }
}

impl std::fmt::Display for RepeatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatError::Io { path, op, source } => {
                write!(f, "failed to {op} {}: {source}", path.display())
            }
            RepeatError::EmptyFile { path } => {
                write!(f, "{} is empty, nothing to repeat", path.display())
            }
            RepeatError::SizeBoundExceeded {
                path,
                step,
                current_size,
                unit_size,
                max_size,
            } => write!(
                f,
                "repetition {step} would grow {} from {current_size} to {} bytes \
                 (max {max_size}); file truncated",
                path.display(),
                current_size.saturating_add(*unit_size)
            ),
        }
    }
}

impl std::error::Error for RepeatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RepeatError::Io { source, .. } => Some(source),
            RepeatError::EmptyFile { .. } => None,
            RepeatError::SizeBoundExceeded { .. } => None,
        }
    }
}

/// Size and first line captured once before any mutation.
struct Snapshot {
    initial_size: u64,
    unit: Vec<u8>,
}

fn snapshot<S: FileStore>(store: &S, path: &Path) -> Result<Snapshot, RepeatError> {
    let initial_size = store
        .size(path)
        .map_err(|e| RepeatError::io(path, IoOp::Stat, e))?;
    if initial_size == 0 {
        return Err(RepeatError::EmptyFile {
            path: path.to_path_buf(),
        });
    }
    let unit = store
        .read_first_line(path)
        .map_err(|e| RepeatError::io(path, IoOp::Read, e))?;
    tracing::debug!(
        path = %path.display(),
        initial_size,
        unit_size = unit.len(),
        "captured repeat unit"
    );
    Ok(Snapshot { initial_size, unit })
}

/// Size after appending one more unit, or `None` if that breaks the bound.
fn next_size(current_size: u64, unit_size: u64, max_size: u64) -> Option<u64> {
    current_size
        .checked_add(unit_size)
        .filter(|&next| next <= max_size)
}

/// Append the first line of `params.path` to the file `params.repetitions`
/// times.
///
/// The running size is tracked locally rather than re-queried after each
/// append. Before each append the bound is checked against the size the file
/// would have afterwards; if it would exceed `max_size` the file is truncated
/// to zero bytes and `SizeBoundExceeded` is returned.
pub fn run<S: FileStore>(
    store: &mut S,
    params: &RepeatParams,
) -> Result<RepeatOutcome, RepeatError> {
    let path = params.path.as_path();
    let Snapshot { initial_size, unit } = snapshot(store, path)?;
    let unit_size = unit.len() as u64;
    let mut current_size = initial_size;

    for i in 0..params.repetitions {
        match next_size(current_size, unit_size, params.max_size) {
            Some(next) => {
                store
                    .append(path, &unit)
                    .map_err(|e| RepeatError::io(path, IoOp::Append, e))?;
                current_size = next;
                tracing::trace!(step = i + 1, current_size, "appended unit");
            }
            None => {
                tracing::warn!(
                    path = %path.display(),
                    step = i + 1,
                    current_size,
                    unit_size,
                    max_size = params.max_size,
                    "size bound exceeded, truncating file"
                );
                store
                    .truncate(path)
                    .map_err(|e| RepeatError::io(path, IoOp::Truncate, e))?;
                return Err(RepeatError::SizeBoundExceeded {
                    path: path.to_path_buf(),
                    step: i + 1,
                    current_size,
                    unit_size,
                    max_size: params.max_size,
                });
            }
        }
    }

    Ok(RepeatOutcome {
        initial_size,
        unit_size,
        appended: params.repetitions,
        final_size: current_size,
    })
}

/// Dry run: same validation and arithmetic as [`run`], no writes.
pub fn plan<S: FileStore>(store: &S, params: &RepeatParams) -> Result<RepeatPlan, RepeatError> {
    let Snapshot { initial_size, unit } = snapshot(store, &params.path)?;
    let unit_size = unit.len() as u64;

    // Steps are identical, so the first failing one is found arithmetically.
    let headroom = params.max_size.saturating_sub(initial_size);
    let fitting = if initial_size > params.max_size {
        0
    } else {
        headroom.checked_div(unit_size).unwrap_or(u64::MAX)
    };

    if fitting >= params.repetitions {
        Ok(RepeatPlan::Fits {
            unit_size,
            final_size: initial_size + params.repetitions * unit_size,
        })
    } else {
        Ok(RepeatPlan::Overflows {
            unit_size,
            step: fitting + 1,
            current_size: initial_size + fitting * unit_size,
        })
    }
}
