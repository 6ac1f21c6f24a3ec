use console::{style, Term};
use libdns_storm::Progress;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
    time::{Duration, Instant},
};

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Single-line progress bar on stderr, redrawn at most every 100ms.
pub struct ProgressBar {
    term: Term,
    total: u64,
    done: AtomicU64,
    last_draw: Mutex<Option<Instant>>,
}

impl ProgressBar {
    pub fn new(total: u64) -> Self {
        Self {
            term: Term::stderr(),
            total,
            done: AtomicU64::new(0),
            last_draw: Mutex::new(None),
        }
    }

    fn draw(&self, done: u64) {
        if !self.term.is_term() {
            return;
        }
        let (_, cols) = self.term.size();
        let (bar, counter) = render(done, self.total, cols as usize);
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&format!(
            "{}{}",
            style(bar).green(),
            style(counter).dim()
        ));
    }
}

impl Progress for ProgressBar {
    fn increment(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;

        // Skip the redraw if another worker is drawing right now.
        let Ok(mut last) = self.last_draw.try_lock() else {
            return;
        };
        if last.is_some_and(|at| at.elapsed() < REDRAW_INTERVAL) && done < self.total {
            return;
        }
        *last = Some(Instant::now());
        self.draw(done);
    }

    fn finish(&self) {
        self.draw(self.done.load(Ordering::Relaxed));
        if self.term.is_term() {
            let _ = self.term.write_line("");
        }
    }
}

fn render(done: u64, total: u64, cols: usize) -> (String, String) {
    let pct = if total > 0 {
        (done.min(total) * 100) / total
    } else {
        0
    };
    let counter = format!(" {:>3}% ({}/{})", pct, done, total);
    let width = cols.saturating_sub(counter.chars().count() + 1).max(10);
    let filled = if total > 0 {
        ((width as u64 * done.min(total)) / total) as usize
    } else {
        0
    };
    let bar = "█".repeat(filled) + &"░".repeat(width - filled);
    (bar, counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_half() {
        let (bar, counter) = render(5, 10, 40);
        assert_eq!(counter, "  50% (5/10)");
        assert_eq!(bar.chars().filter(|c| *c == '█').count(), bar.chars().count() / 2);
        assert_eq!(bar.chars().count() + counter.chars().count(), 39);
    }

    #[test]
    fn test_render_never_overflows() {
        let (bar, counter) = render(12, 10, 5);
        assert_eq!(counter, " 100% (12/10)");
        assert!(bar.chars().all(|c| c == '█'));
    }

    #[test]
    fn test_render_empty_total() {
        let (bar, counter) = render(0, 0, 30);
        assert_eq!(counter, "   0% (0/0)");
        assert!(bar.chars().all(|c| c == '░'));
    }
}
