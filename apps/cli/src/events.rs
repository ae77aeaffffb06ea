use std::io::Write;

use client_core::{ClientEvent, NoticeLevel};
use tokio::{sync::broadcast, task::JoinHandle};

/// Prints notices and upload progress to stderr until every sender is gone.
pub fn spawn_printer(mut rx: broadcast::Receiver<ClientEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut progress_open = false;
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event printer lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match event {
                ClientEvent::UploadProgress { percent } => {
                    eprint!("\rMengunggah... {percent:>3}%");
                    let _ = std::io::stderr().flush();
                    progress_open = true;
                }
                ClientEvent::Notice(notice) => {
                    if std::mem::take(&mut progress_open) {
                        eprintln!();
                    }
                    let tag = match notice.level {
                        NoticeLevel::Success => "ok",
                        NoticeLevel::Info => "info",
                        NoticeLevel::Warning => "warn",
                        NoticeLevel::Error => "error",
                    };
                    eprintln!("[{tag}] {}", notice.message);
                }
                _ => {}
            }
        }
        if progress_open {
            eprintln!();
        }
    })
}
