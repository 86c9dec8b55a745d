use crate::errors::PeptideError;
use serde::{
    Deserialize,
    Serialize,
};

/// Whether a result comes from the real library entry or its decoy.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, std::hash::Hash, PartialOrd, Ord,
)]
pub enum DecoyMarking {
    Target,
    Decoy,
}

impl DecoyMarking {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecoyMarking::Target => "Target",
            DecoyMarking::Decoy => "Decoy",
        }
    }

    pub fn is_decoy(&self) -> bool {
        matches!(self, DecoyMarking::Decoy)
    }

    pub fn is_target(&self) -> bool {
        !self.is_decoy()
    }
}

impl From<bool> for DecoyMarking {
    fn from(is_decoy: bool) -> Self {
        if is_decoy {
            DecoyMarking::Decoy
        } else {
            DecoyMarking::Target
        }
    }
}

/// Index one past the `]` closing the bracket opened at `open`.
fn closing_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits a ProForma sequence into its N-terminal modification prefix,
/// its residues (each with the modifications that follow it), and its
/// C-terminal modification suffix.
pub(crate) fn residue_tokens(sequence: &str) -> Result<(&str, Vec<&str>, &str), PeptideError> {
    let unbalanced = || PeptideError::UnbalancedModification {
        sequence: sequence.to_string(),
    };
    let bytes = sequence.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'[') {
        let end = closing_bracket(bytes, 0).ok_or_else(unbalanced)?;
        if bytes.get(end) != Some(&b'-') {
            return Err(PeptideError::ParsingError {
                sequence: sequence.to_string(),
                error: "Leading modification is not N-terminal".to_string(),
            });
        }
        i = end + 1;
    }
    let prefix_end = i;
    let mut suffix_start = bytes.len();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    while i < bytes.len() {
        match bytes[i] {
            b'-' => {
                suffix_start = i;
                break;
            }
            b'[' => {
                let end = closing_bracket(bytes, i).ok_or_else(unbalanced)?;
                let last = spans.last_mut().ok_or_else(unbalanced)?;
                last.1 = end;
                i = end;
            }
            b']' => return Err(unbalanced()),
            b if b.is_ascii_alphabetic() => {
                spans.push((i, i + 1));
                i += 1;
            }
            other => {
                return Err(PeptideError::ParsingError {
                    sequence: sequence.to_string(),
                    error: format!("Unexpected character {:?}", other as char),
                });
            }
        }
    }
    let residues = spans.iter().map(|&(s, e)| &sequence[s..e]).collect();
    Ok((
        &sequence[..prefix_end],
        residues,
        &sequence[suffix_start..],
    ))
}

/// Reverses the sequence keeping both terminal residues in place.
///
/// Modifications move with their residue, terminal modifications stay
/// at their terminus.
pub(crate) fn as_decoy_string(sequence: &str) -> Result<String, PeptideError> {
    let (prefix, residues, suffix) = residue_tokens(sequence)?;
    if residues.len() < 3 {
        return Ok(sequence.to_string());
    }
    let last = residues.len() - 1;
    let mut out = String::with_capacity(sequence.len());
    out.push_str(prefix);
    out.push_str(residues[0]);
    residues[1..last].iter().rev().for_each(|r| out.push_str(r));
    out.push_str(residues[last]);
    out.push_str(suffix);
    Ok(out)
}
