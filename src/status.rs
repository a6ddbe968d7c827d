use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerKind {
    Success,
    Error,
    Info,
}

impl BannerKind {
    pub fn icon(self) -> &'static str {
        match self {
            BannerKind::Success => "✅ ",
            BannerKind::Error => "❌ ",
            BannerKind::Info => "ℹ️ ",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Banner {
    pub message: String,
    pub kind: BannerKind,
}

impl Banner {
    /// Icon followed by the message, as displayed.
    pub fn text(&self) -> String {
        format!("{}{}", self.kind.icon(), self.message)
    }
}

#[derive(Clone, Debug, Default)]
struct Slot {
    banner: Option<Banner>,
    // Bumped on every show/hide so a pending auto-dismiss can tell it was superseded.
    generation: u64,
}

/// Single-slot status banner. The newest message always wins.
#[derive(Clone)]
pub struct StatusPresenter {
    slot: Arc<watch::Sender<Slot>>,
    dismiss_after: Duration,
}

impl StatusPresenter {
    pub fn new(dismiss_after: Duration) -> Self {
        let (tx, _) = watch::channel(Slot::default());
        Self {
            slot: Arc::new(tx),
            dismiss_after,
        }
    }

    pub fn show(&self, message: impl Into<String>, kind: BannerKind) {
        let banner = Banner {
            message: message.into(),
            kind,
        };
        debug!("Status: {}", banner.text());

        let mut generation = 0;
        self.slot.send_modify(|slot| {
            slot.generation += 1;
            slot.banner = Some(banner);
            generation = slot.generation;
        });

        if kind == BannerKind::Success {
            let slot = self.slot.clone();
            let delay = self.dismiss_after;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                slot.send_if_modified(|slot| {
                    if slot.generation == generation {
                        slot.banner = None;
                        true
                    } else {
                        false
                    }
                });
            });
        }
    }

    pub fn hide(&self) {
        self.slot.send_modify(|slot| {
            slot.generation += 1;
            slot.banner = None;
        });
    }

    pub fn current(&self) -> Option<Banner> {
        self.slot.borrow().banner.clone()
    }
}
