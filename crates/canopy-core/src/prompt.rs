//! Console confirmation prompts. Decline is the default answer: EOF, a read
//! failure, an interrupt, or anything but `y`/`Y` cancels.

use std::io::{BufRead, Write};
use std::sync::{Mutex, Once};

static INTERRUPT_HINT: Mutex<Option<String>> = Mutex::new(None);
static INSTALL_HANDLER: Once = Once::new();

/// Make Ctrl-C during a prompt print `hint` and exit instead of dying
/// mid-line. The handler is installed once; later calls replace the hint as
/// a flow moves past its prompts.
pub fn set_interrupt_hint(hint: impl Into<String>) {
    INSTALL_HANDLER.call_once(|| {
        let _ = ctrlc::set_handler(|| {
            eprintln!();
            if let Ok(guard) = INTERRUPT_HINT.lock() {
                if let Some(msg) = guard.as_deref() {
                    println!("{msg}");
                }
            }
            std::process::exit(130);
        });
    });
    if let Ok(mut guard) = INTERRUPT_HINT.lock() {
        *guard = Some(hint.into());
    }
}

pub fn confirm(question: &str) -> bool {
    let mut err = std::io::stderr().lock();
    if write!(err, "{question} [y/N] ").and_then(|_| err.flush()).is_err() {
        return false;
    }

    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => {
            let _ = writeln!(err);
            false
        }
        Ok(_) => line.trim().eq_ignore_ascii_case("y"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_hint_replaces_previous_value() {
        set_interrupt_hint("first");
        set_interrupt_hint("second");
        let guard = INTERRUPT_HINT.lock().unwrap();
        assert_eq!(guard.as_deref(), Some("second"));
    }
}
