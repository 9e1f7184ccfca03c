//! 帧游标：按秒跨步定位表格变化，再逐帧锁定变化前后的稳定帧

use super::error::VideoError;
use super::frame::Frame;
use super::layout::TableLayout;
use super::shot::{ChangeRange, Shot};
use super::source::FrameSource;
use log::{debug, trace};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum CursorState {
    Seeking,
    PreChangeFound,
    DebouncingPostChange { stable_count: u32 },
    Stable,
    EndOfStream,
}

/// One visible table transition.
#[derive(Debug, Clone)]
pub struct FrameChange {
    /// Last stable frame before the change.
    pub pre: Frame,
    /// First frame of the new stable state; `None` at end of stream.
    pub post: Option<Frame>,
    /// Rows to re-read; `None` when `post` is `None`.
    pub rows: Option<ChangeRange>,
    /// Backed-off transition position; seeding a cursor here replays this change.
    pub resume_pos: u64,
}

pub struct FrameCursor {
    source: Box<dyn FrameSource>,
    layout: Arc<TableLayout>,
    frame_pos: u64,
    stride: u64,
    last_shot: Shot,
    state: CursorState,
}

impl FrameCursor {
    /// Seek to `start_pos` and take the frame there as the stable reference.
    pub fn new(
        mut source: Box<dyn FrameSource>,
        layout: Arc<TableLayout>,
        start_pos: u64,
    ) -> Result<Self, VideoError> {
        source.seek(start_pos)?;
        let frame = source.read()?.ok_or(VideoError::EmptyAt(start_pos))?;
        let last_shot = Shot::new(frame, &layout);
        let stride = source.fps().round().max(1.0) as u64;

        debug!(
            "Cursor seeded at frame {} (bar {:?}, stride {})",
            start_pos,
            last_shot.bar(),
            stride
        );

        Ok(Self {
            source,
            layout,
            frame_pos: start_pos,
            stride,
            last_shot,
            state: CursorState::Seeking,
        })
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn frame_pos(&self) -> u64 {
        self.frame_pos
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// The current stable reference frame and its bar row.
    pub fn current(&self) -> (&Frame, Option<usize>) {
        (self.last_shot.frame(), self.last_shot.bar())
    }

    fn read_shot(&mut self) -> Result<Option<Shot>, VideoError> {
        Ok(self
            .source
            .read()?
            .map(|frame| Shot::new(frame, &self.layout)))
    }

    /// Read the next shot and compare it with `reference` (the stable shot by default).
    fn compare_next(&mut self, reference: Option<&Shot>) -> Result<(Option<Shot>, bool), VideoError> {
        let shot = self.read_shot()?;
        let reference = reference.unwrap_or(&self.last_shot);
        let same = shot
            .as_ref()
            .is_some_and(|s| reference.is_similar(s, &self.layout));
        Ok((shot, same))
    }

    /// 每次跨一秒，遇到不相似的帧就退回一步
    pub fn find_transition(&mut self) -> Result<u64, VideoError> {
        self.state = CursorState::Seeking;
        loop {
            self.frame_pos += self.stride;
            self.source.seek(self.frame_pos)?;
            let (_, same) = self.compare_next(None)?;
            if !same {
                self.frame_pos -= self.stride;
                self.source.seek(self.frame_pos)?;
                trace!("Transition after frame {}", self.frame_pos);
                return Ok(self.frame_pos);
            }
        }
    }

    /// Step frame by frame until the table differs from the stable reference.
    ///
    /// Keeps the two most recent similar shots and returns the older one.
    pub fn find_pre_change(&mut self) -> Result<Shot, VideoError> {
        let mut shots: VecDeque<Shot> = VecDeque::with_capacity(2);
        shots.push_back(self.last_shot.clone());
        loop {
            let (shot, same) = self.compare_next(None)?;
            match shot {
                Some(shot) if same => {
                    if shots.len() == 2 {
                        shots.pop_front();
                    }
                    shots.push_back(shot);
                }
                _ => {
                    self.state = CursorState::PreChangeFound;
                    return shots
                        .pop_front()
                        .ok_or(VideoError::EmptyAt(self.frame_pos));
                }
            }
        }
    }

    /// 跳过滚动动画帧：候选帧需要连续两帧保持相似才被接受
    pub fn find_post_change(&mut self) -> Result<Option<Shot>, VideoError> {
        let Some(mut candidate) = self.read_shot()? else {
            self.state = CursorState::EndOfStream;
            return Ok(None);
        };
        let mut stable_count = 0;
        self.state = CursorState::DebouncingPostChange { stable_count };

        loop {
            let (shot, same) = self.compare_next(Some(&candidate))?;
            let Some(shot) = shot else {
                self.state = CursorState::EndOfStream;
                return Ok(None);
            };

            if same {
                stable_count += 1;
                self.state = CursorState::DebouncingPostChange { stable_count };
                if stable_count > 1 {
                    self.frame_pos = self.source.position().saturating_sub(1);
                    self.last_shot = shot.clone();
                    self.state = CursorState::Stable;
                    return Ok(Some(shot));
                }
            } else {
                stable_count = 0;
                self.state = CursorState::DebouncingPostChange { stable_count };
                candidate = shot;
            }
        }
    }

    pub fn next_change(&mut self) -> Result<FrameChange, VideoError> {
        let resume_pos = self.find_transition()?;
        let pre = self.find_pre_change()?;
        let post = self.find_post_change()?;

        let change = match post {
            None => FrameChange {
                pre: pre.into_frame(),
                post: None,
                rows: None,
                resume_pos,
            },
            Some(post) => {
                let rows = pre.change_range(&post, &self.layout);
                debug!(
                    "Change at frame {} -> {}: rows {:?}",
                    resume_pos, self.frame_pos, rows
                );
                FrameChange {
                    pre: pre.into_frame(),
                    post: Some(post.into_frame()),
                    rows,
                    resume_pos,
                }
            }
        };
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{compact_layout, source, Palette, Screen};

    fn cursor(segments: &[(&Screen, usize)]) -> FrameCursor {
        let layout = compact_layout();
        let mut palette = Palette::new();
        let src = source(segments, &layout, &mut palette);
        FrameCursor::new(Box::new(src), Arc::new(layout), 0).unwrap()
    }

    #[test]
    fn test_empty_source_is_an_error() {
        let layout = Arc::new(compact_layout());
        let src = Box::new(crate::core::video::VecFrameSource::new(Vec::new(), 2.0));
        assert!(matches!(
            FrameCursor::new(src, layout, 0),
            Err(VideoError::EmptyAt(0))
        ));
    }

    #[test]
    fn test_transition_backs_off_one_stride() {
        let a = Screen::with_ids(&["11", "12"]);
        let b = Screen::with_ids(&["11", "13"]);
        let mut c = cursor(&[(&a, 6), (&Screen::transient(), 1), (&b, 6)]);

        assert_eq!(c.stride(), 2);
        // 2 和 4 相似，6 是过渡帧
        assert_eq!(c.find_transition().unwrap(), 4);
        assert_eq!(*c.state(), CursorState::Seeking);
    }

    #[test]
    fn test_next_change_isolates_stable_frames() {
        let a = Screen::with_ids(&["11", "12"]);
        let b = Screen::with_ids(&["11", "13"]);
        let mut c = cursor(&[(&a, 6), (&Screen::transient(), 1), (&b, 6)]);

        let change = c.next_change().unwrap();
        assert_eq!(change.resume_pos, 4);
        assert_eq!(change.pre.frame_number, 4);
        assert_eq!(change.post.as_ref().map(|f| f.frame_number), Some(9));
        assert_eq!(change.rows, Some(ChangeRange { start: 1, end: 2 }));
        assert_eq!(c.frame_pos(), 9);
        assert_eq!(*c.state(), CursorState::Stable);

        let last = c.next_change().unwrap();
        assert!(last.post.is_none());
        assert!(last.rows.is_none());
        assert_eq!(last.resume_pos, 11);
        assert_eq!(last.pre.frame_number, 11);
        assert_eq!(*c.state(), CursorState::EndOfStream);
    }

    #[test]
    fn test_post_change_skips_transient_frames() {
        let a = Screen::with_ids(&["11"]);
        let b = Screen::with_ids(&["11", "12"]);
        let t = Screen::transient();
        // 一帧 b 夹在过渡帧之间，不能被当成稳定帧
        let mut c = cursor(&[(&a, 4), (&t, 1), (&b, 1), (&t, 1), (&b, 5)]);

        let change = c.next_change().unwrap();
        assert_eq!(change.pre.frame_number, 2);
        assert_eq!(change.post.as_ref().map(|f| f.frame_number), Some(9));
        assert_eq!(change.rows, Some(ChangeRange { start: 1, end: 2 }));
    }

    #[test]
    fn test_stream_ending_during_debounce() {
        let a = Screen::with_ids(&["11"]);
        let b = Screen::with_ids(&["11", "12"]);
        let mut c = cursor(&[(&a, 4), (&Screen::transient(), 1), (&b, 2)]);

        let change = c.next_change().unwrap();
        assert!(change.post.is_none());
        assert_eq!(*c.state(), CursorState::EndOfStream);
    }

    #[test]
    fn test_resume_position_replays_the_change() {
        let a = Screen::with_ids(&["11", "12"]);
        let b = Screen::with_ids(&["11", "13"]);
        let layout = compact_layout();
        let mut palette = Palette::new();
        let segments = [(&a, 6), (&Screen::transient(), 1), (&b, 6)];

        let src = source(&segments, &layout, &mut palette);
        let mut first = FrameCursor::new(Box::new(src), Arc::new(layout.clone()), 0).unwrap();
        let original = first.next_change().unwrap();

        let src = source(&segments, &layout, &mut palette);
        let mut resumed =
            FrameCursor::new(Box::new(src), Arc::new(layout), original.resume_pos).unwrap();
        let replay = resumed.next_change().unwrap();

        assert_eq!(replay.resume_pos, original.resume_pos);
        assert_eq!(replay.rows, original.rows);
        assert_eq!(
            replay.post.map(|f| f.frame_number),
            original.post.map(|f| f.frame_number)
        );
    }
}
