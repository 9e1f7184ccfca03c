//! 交易重建：驱动帧游标，维护可见行列表和持仓账本

use super::config::ReconstructConfig;
use super::error::ReconstructError;
use super::state::Phase;
use crate::core::ledger::{
    all_distinct, correct_end_times, validate, Checkpoint, Ledger, LedgerError, LedgerStore,
    PositionRecord, ValidationReport, VisibleRows,
};
use crate::core::ocr::{Recognizer, TableFrameReader, TextReader};
use crate::core::video::{ChangeRange, Frame, FrameCursor, FrameSource, TableLayout};
use log::{debug, info, warn};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ReconstructOutcome {
    /// Commits made by this run.
    pub commits: u64,
    pub records: usize,
    pub open_positions: usize,
    /// `None` when the run stopped before validation.
    pub report: Option<ValidationReport>,
    pub corrected: bool,
    pub stopped_early: bool,
}

/// State owned by one run.
struct Session {
    cursor: FrameCursor,
    ledger: Ledger,
    visible: VisibleRows,
    commits: u64,
    checkpoint_pos: u64,
}

/// A change whose ids read back distinct.
struct PendingChange {
    before: TableFrameReader,
    after: TableFrameReader,
    rows: ChangeRange,
    ids: Vec<String>,
    resume_pos: u64,
}

pub struct TradeReconstructor {
    layout: Arc<TableLayout>,
    text: TextReader,
    store: Box<dyn LedgerStore>,
    config: ReconstructConfig,
    phase: Phase,
}

impl TradeReconstructor {
    pub fn new(
        layout: Arc<TableLayout>,
        recognizer: Arc<dyn Recognizer>,
        store: Box<dyn LedgerStore>,
        config: ReconstructConfig,
    ) -> Self {
        Self {
            layout,
            text: TextReader::new(recognizer),
            store,
            config,
            phase: Phase::Init,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &ReconstructConfig {
        &self.config
    }

    fn enter(&mut self, phase: Phase) {
        debug!("Phase {} -> {}", self.phase.name(), phase.name());
        self.phase = phase;
    }

    fn reader(&self, frame: Frame) -> TableFrameReader {
        TableFrameReader::new(frame, self.layout.clone(), self.text.clone())
    }

    pub fn run(&mut self, source: Box<dyn FrameSource>) -> Result<ReconstructOutcome, ReconstructError> {
        self.enter(Phase::Init);
        let mut session = self.init(source)?;

        self.enter(Phase::Scanning);
        let (commits, stopped_early) = self.scan(&mut session)?;

        let mut outcome = ReconstructOutcome {
            commits,
            records: session.ledger.len(),
            open_positions: session.ledger.open_orders().len(),
            report: None,
            corrected: false,
            stopped_early,
        };
        if stopped_early {
            info!(
                "Stopped after {} commits, resume point at frame {}",
                commits, session.checkpoint_pos
            );
            self.enter(Phase::Done);
            return Ok(outcome);
        }

        self.enter(Phase::Validating);
        let report = validate(&session.ledger, &self.config.validation);
        if report.allows_correction() {
            self.enter(Phase::Correcting);
            let corrected = correct_end_times(&session.ledger)?;
            self.store.save_corrected(&corrected)?;
            outcome.corrected = true;
        }
        outcome.report = Some(report);

        self.enter(Phase::Done);
        Ok(outcome)
    }

    /// 恢复断点，或从第一帧建立初始可见行
    fn init(&mut self, source: Box<dyn FrameSource>) -> Result<Session, ReconstructError> {
        let (ledger, checkpoint) = if self.config.resume {
            (
                self.store.load()?.unwrap_or_default(),
                self.store.load_checkpoint()?,
            )
        } else {
            self.store.clear()?;
            (Ledger::new(), None)
        };

        if let Some(checkpoint) = checkpoint {
            info!(
                "Resuming at frame {} with {} visible rows ({} records)",
                checkpoint.frame_pos,
                checkpoint.visible.len(),
                ledger.len()
            );
            let cursor = FrameCursor::new(source, self.layout.clone(), checkpoint.frame_pos)?;
            return Ok(Session {
                cursor,
                ledger,
                visible: checkpoint.visible,
                commits: checkpoint.commits,
                checkpoint_pos: checkpoint.frame_pos,
            });
        }

        if let Some(frame_pos) = ledger.last_frame_pos() {
            let visible = VisibleRows::new(ledger.open_orders());
            warn!(
                "No checkpoint, resuming from the staged ledger at frame {} ({} open)",
                frame_pos,
                visible.len()
            );
            let cursor = FrameCursor::new(source, self.layout.clone(), frame_pos)?;
            return Ok(Session {
                cursor,
                ledger,
                visible,
                commits: 0,
                checkpoint_pos: frame_pos,
            });
        }

        let cursor = FrameCursor::new(source, self.layout.clone(), 0)?;
        let (frame, bar) = cursor.current();
        let seed = self.reader(frame.clone());
        let rows = bar.unwrap_or_else(|| {
            warn!("No cursor row on the first frame, starting with an empty table");
            0
        });
        let visible = VisibleRows::new(seed.identities(0..rows)?);

        let mut session = Session {
            cursor,
            ledger,
            visible: VisibleRows::default(),
            commits: 0,
            checkpoint_pos: 0,
        };
        for (row, order) in session.visible.arrived(&visible) {
            let fields = seed.row_fields(row)?;
            session
                .ledger
                .open(PositionRecord::open(order, fields, 0))?;
        }
        info!("Initial table: {:?}", visible.ids());
        session.visible = visible;
        self.persist(&session)?;
        Ok(session)
    }

    /// Returns `(commits, stopped_early)`.
    fn scan(&mut self, session: &mut Session) -> Result<(u64, bool), ReconstructError> {
        let mut commits = 0u64;
        loop {
            if self.config.max_commits.is_some_and(|max| commits >= max) {
                return Ok((commits, true));
            }
            let Some(change) = self.next_pending(&mut session.cursor)? else {
                info!("End of video at frame {}", session.cursor.frame_pos());
                return Ok((commits, false));
            };
            self.commit(session, change)?;
            commits += 1;
        }
    }

    /// 订单号重复说明识别不可靠：放弃这次读取，合并到下一次变化
    fn next_pending(&self, cursor: &mut FrameCursor) -> Result<Option<PendingChange>, ReconstructError> {
        let change = cursor.next_change()?;
        let (Some(post), Some(mut rows)) = (change.post, change.rows) else {
            return Ok(None);
        };
        let resume_pos = change.resume_pos;
        let before = self.reader(change.pre);
        let mut after = self.reader(post);
        let mut retries = 0u32;

        loop {
            let ids = after.identities(rows.rows())?;
            if all_distinct(&ids) {
                return Ok(Some(PendingChange {
                    before,
                    after,
                    rows,
                    ids,
                    resume_pos,
                }));
            }
            if retries >= self.config.max_collision_retries {
                return Err(ReconstructError::PersistentCollision {
                    frame_pos: resume_pos,
                    retries,
                    ids,
                });
            }
            retries += 1;
            warn!(
                "Duplicate ids {:?} in rows {:?} at frame {}, waiting for the next change",
                ids,
                rows.rows(),
                cursor.frame_pos()
            );

            let next = cursor.next_change()?;
            match (next.post, next.rows) {
                (Some(post), Some(next_rows)) => {
                    after = self.reader(post);
                    rows = rows.union(&next_rows);
                }
                _ => {
                    warn!("Video ended while ids were still colliding, change dropped");
                    return Ok(None);
                }
            }
        }
    }

    fn commit(&mut self, session: &mut Session, change: PendingChange) -> Result<(), ReconstructError> {
        let PendingChange {
            before,
            after,
            rows,
            ids,
            resume_pos,
        } = change;
        let next = session.visible.replace_from(rows.start, ids);

        for (row, order) in session.visible.departed(&next) {
            let end_time = before.timestamp()?.to_string();
            let end_price = before.close_price(row)?;
            info!("Closed {} at {} @ {}", order, end_time, end_price);
            match session.ledger.close(&order, end_time, end_price) {
                Ok(()) => {}
                Err(LedgerError::AlreadyClosed(order)) => {
                    warn!("Order {} closed twice, keeping the first close", order)
                }
                Err(LedgerError::UnknownOrder(order)) => {
                    warn!("Order {} left the screen but was never opened", order)
                }
                Err(e) => return Err(e.into()),
            }
        }

        for (row, order) in session.visible.arrived(&next) {
            if session.ledger.contains(&order) {
                debug!("Order {} is back on screen", order);
                continue;
            }
            let fields = after.row_fields(row)?;
            info!(
                "Opened {} {} {} {} @ {}",
                order,
                fields.kind.trim(),
                fields.size,
                fields.symbol,
                fields.price
            );
            session
                .ledger
                .open(PositionRecord::open(order, fields, resume_pos))?;
        }

        session.visible = next;
        session.commits += 1;
        session.checkpoint_pos = resume_pos;
        self.persist(session)
    }

    fn persist(&mut self, session: &Session) -> Result<(), ReconstructError> {
        let checkpoint = Checkpoint {
            frame_pos: session.checkpoint_pos,
            visible: session.visible.clone(),
            commits: session.commits,
        };
        self.store.save(&session.ledger, &checkpoint)?;
        Ok(())
    }
}
