//! Interactive selection backends.
//!
//! Every interactive flow picks from a list through the [`Picker`] trait;
//! which backend serves it depends only on what is installed on the host.
//! Cancelling is not an error: a single pick returns `None` and a multi
//! pick returns an empty list.

use std::io::{BufRead, Write};

use canopy_exec::{run_capture, run_capture_with_input, tool_available};

use crate::error::MuxResult;

pub trait Picker {
    /// Backend name, for logging.
    fn id(&self) -> &'static str;

    fn is_available(&self) -> bool;

    /// Pick one item, returning its index. `Ok(None)` means the user
    /// cancelled.
    fn pick(&self, prompt: &str, items: &[String]) -> MuxResult<Option<usize>>;

    /// Pick any number of items by index. Empty means cancelled or nothing
    /// chosen.
    fn pick_many(&self, prompt: &str, items: &[String]) -> MuxResult<Vec<usize>>;
}

/// The best available backend: fzf, then gum, then a plain numbered menu.
pub fn default_picker() -> Box<dyn Picker> {
    for picker in [
        Box::new(FzfPicker) as Box<dyn Picker>,
        Box::new(GumPicker),
        Box::new(NumberedPicker),
    ] {
        if picker.is_available() {
            tracing::debug!(backend = picker.id(), "selected picker backend");
            return picker;
        }
    }
    unreachable!("numbered picker is always available")
}

pub struct FzfPicker;

impl FzfPicker {
    fn run(&self, prompt: &str, items: &[String], multi: bool) -> MuxResult<Vec<String>> {
        let prompt = format!("{prompt} > ");
        let mut args = vec!["--prompt", &prompt, "--height", "40%", "--reverse"];
        if multi {
            args.push("--multi");
        }
        let out = run_capture_with_input("fzf", &args, &items.join("\n"))?;
        if !out.success() {
            // 1 = no match, 130 = ctrl-c / esc. Both are a cancel.
            return Ok(Vec::new());
        }
        Ok(out.stdout.lines().map(str::to_string).collect())
    }
}

impl Picker for FzfPicker {
    fn id(&self) -> &'static str {
        "fzf"
    }

    fn is_available(&self) -> bool {
        tool_available("fzf")
    }

    fn pick(&self, prompt: &str, items: &[String]) -> MuxResult<Option<usize>> {
        Ok(indices_of(items, &self.run(prompt, items, false)?).into_iter().next())
    }

    fn pick_many(&self, prompt: &str, items: &[String]) -> MuxResult<Vec<usize>> {
        Ok(indices_of(items, &self.run(prompt, items, true)?))
    }
}

pub struct GumPicker;

impl GumPicker {
    fn run(&self, prompt: &str, items: &[String], multi: bool) -> MuxResult<Vec<String>> {
        let mut args = vec![
            "choose".to_string(),
            "--header".to_string(),
            prompt.to_string(),
        ];
        if multi {
            args.push("--no-limit".to_string());
        }
        args.extend(items.iter().cloned());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = run_capture("gum", &args, None)?;
        if !out.success() {
            return Ok(Vec::new());
        }
        Ok(out.stdout.lines().map(str::to_string).collect())
    }
}

impl Picker for GumPicker {
    fn id(&self) -> &'static str {
        "gum"
    }

    fn is_available(&self) -> bool {
        tool_available("gum")
    }

    fn pick(&self, prompt: &str, items: &[String]) -> MuxResult<Option<usize>> {
        Ok(indices_of(items, &self.run(prompt, items, false)?).into_iter().next())
    }

    fn pick_many(&self, prompt: &str, items: &[String]) -> MuxResult<Vec<usize>> {
        Ok(indices_of(items, &self.run(prompt, items, true)?))
    }
}

/// Fallback menu on plain stdio, for hosts with neither fzf nor gum.
pub struct NumberedPicker;

impl NumberedPicker {
    fn prompt_line(&self, prompt: &str, items: &[String], multi: bool) -> MuxResult<String> {
        let mut err = std::io::stderr().lock();
        for (i, item) in items.iter().enumerate() {
            writeln!(err, "  {}) {}", i + 1, item)?;
        }
        if multi {
            write!(err, "{prompt} (numbers, or 'all'): ")?;
        } else {
            write!(err, "{prompt} (number): ")?;
        }
        err.flush()?;

        let mut line = String::new();
        // EOF reads as cancel, same as an empty answer.
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}

impl Picker for NumberedPicker {
    fn id(&self) -> &'static str {
        "numbered"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn pick(&self, prompt: &str, items: &[String]) -> MuxResult<Option<usize>> {
        if items.is_empty() {
            return Ok(None);
        }
        let line = self.prompt_line(prompt, items, false)?;
        Ok(parse_single_selection(&line, items.len()))
    }

    fn pick_many(&self, prompt: &str, items: &[String]) -> MuxResult<Vec<usize>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let line = self.prompt_line(prompt, items, true)?;
        Ok(parse_multi_selection(&line, items.len()).unwrap_or_default())
    }
}

/// Map the lines a backend printed back to item indices. Lines not in the
/// item list are dropped; duplicate items resolve to the first occurrence.
fn indices_of(items: &[String], lines: &[String]) -> Vec<usize> {
    lines
        .iter()
        .filter_map(|line| items.iter().position(|item| item == line))
        .collect()
}

/// Parse a 1-based menu answer. Anything unparsable or out of range is a
/// cancel.
fn parse_single_selection(line: &str, len: usize) -> Option<usize> {
    let n: usize = line.trim().parse().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

/// Parse a multi answer: 1-based numbers separated by commas or spaces, or
/// `all` / `*` for everything. One bad token cancels the whole selection.
fn parse_multi_selection(line: &str, len: usize) -> Option<Vec<usize>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "all" || trimmed == "*" {
        return Some((0..len).collect());
    }
    let mut picked = Vec::new();
    for token in trimmed.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        let n: usize = token.parse().ok()?;
        if !(1..=len).contains(&n) {
            return None;
        }
        if !picked.contains(&(n - 1)) {
            picked.push(n - 1);
        }
    }
    if picked.is_empty() {
        None
    } else {
        Some(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_selection_bounds() {
        assert_eq!(parse_single_selection("2\n", 3), Some(1));
        assert_eq!(parse_single_selection(" 3 ", 3), Some(2));
        assert_eq!(parse_single_selection("0", 3), None);
        assert_eq!(parse_single_selection("4", 3), None);
        assert_eq!(parse_single_selection("", 3), None);
        assert_eq!(parse_single_selection("two", 3), None);
    }

    #[test]
    fn multi_selection_accepts_commas_and_spaces() {
        assert_eq!(parse_multi_selection("1,3", 3), Some(vec![0, 2]));
        assert_eq!(parse_multi_selection("3 1", 3), Some(vec![2, 0]));
        assert_eq!(parse_multi_selection("1, 2, 1", 3), Some(vec![0, 1]));
    }

    #[test]
    fn multi_selection_all_keyword() {
        assert_eq!(parse_multi_selection("all", 2), Some(vec![0, 1]));
        assert_eq!(parse_multi_selection("*", 2), Some(vec![0, 1]));
    }

    #[test]
    fn multi_selection_bad_token_cancels() {
        assert_eq!(parse_multi_selection("1,9", 3), None);
        assert_eq!(parse_multi_selection("x", 3), None);
        assert_eq!(parse_multi_selection("", 3), None);
        assert_eq!(parse_multi_selection("  \n", 3), None);
    }

    #[test]
    fn backend_lines_map_back_to_indices() {
        let items: Vec<String> = ["alpha", "beta", "gamma"].map(String::from).into();
        let picked: Vec<String> = ["gamma", "alpha"].map(String::from).into();
        assert_eq!(indices_of(&items, &picked), vec![2, 0]);

        let unknown: Vec<String> = ["delta"].map(String::from).into();
        assert!(indices_of(&items, &unknown).is_empty());
    }

    #[test]
    fn default_picker_always_resolves() {
        let picker = default_picker();
        assert!(picker.is_available());
    }
}
