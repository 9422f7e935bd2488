use std::io::BufRead;

use tokio::sync::mpsc;

#[derive(Debug, PartialEq, Eq)]
pub enum Event {
    Line(String),
    /// Input reached end of file or failed
    Closed,
}

/// Reads input lines on a dedicated thread and forwards them as [`Event`]s.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Read from standard input.
    pub fn stdin() -> Self {
        Self::from_reader(std::io::stdin())
    }

    pub fn from_reader<R: std::io::Read + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            let reader = std::io::BufReader::new(reader);
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if tx.send(Event::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = tx.send(Event::Closed);
        });

        Self { rx }
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
