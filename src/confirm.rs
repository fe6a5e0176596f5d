//! Interactive confirmation for risky updates.

use std::io::{self, BufRead, Write};

use tracing::warn;

use groundwork_reconciler::Confirm;

/// Blocking y/N prompt on the controlling terminal. Anything other than an
/// explicit yes declines.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, summary: &str) -> bool {
        println!("{summary}");
        print!("Apply these changes? [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
            Err(err) => {
                warn!(error = %err, "could not read confirmation; declining");
                false
            }
        }
    }
}
