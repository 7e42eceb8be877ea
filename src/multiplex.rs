//! Shared-cursor wrapping for seekable streams.
//!
//! [`MultiplexableStream`] owns a single seekable [`Stream`] and can hand
//! out any number of [`ChildStream`] cursors over it. Stateless operations
//! (`flush`, `size`, `capabilities`, `name`) pass straight through to the
//! parent. Stateful operations (`read`, `write`, `get_pos`, `set_pos`,
//! `create_file_mapping`) first *activate* the calling child: if a
//! different child was active, its position is saved, the parent is
//! seeked to the calling child's saved position, and the calling child
//! becomes active. At most one child is active at a time; the active
//! child's notion of its own position is simply "wherever the parent
//! currently is".
//!
//! There is no source analog for this component (the design notes call
//! out that the source's back-pointer cycle — child -> parent -> child —
//! does not translate into safe Rust); the replacement follows the
//! crate's own established idiom for shared mutable state guarded by one
//! [`Mutex`] (see [`crate::controller::Controller`],
//! [`crate::timer::Timer`]): a reference-counted control node that
//! outlives the parent, which clears a non-owning slot in the node on
//! drop rather than the node holding the parent alive.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

use crate::error::{AsyncError, AsyncResult};

/// What a [`Stream`] supports. A child reports its parent's capabilities
/// unchanged; a zombie (parent gone) reports none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamCapabilities {
    pub readable: bool,
    pub writable: bool,
    pub seekable: bool,
}

/// The capability a [`MultiplexableStream`] wraps.
///
/// Any `Read + Write + Seek + Send` type can be adapted via
/// [`GenericStream`]; implement this directly when `size`/`capabilities`
/// need something other than a `seek`-to-end probe.
pub trait Stream: Send {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
    fn flush(&mut self) -> io::Result<()>;
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;
    fn stream_position(&mut self) -> io::Result<u64> {
        self.seek(SeekFrom::Current(0))
    }
    fn size(&mut self) -> io::Result<u64>;
    fn capabilities(&self) -> StreamCapabilities;
    fn name(&self) -> String;
    /// Out of scope for this crate (concrete file mapping is a
    /// filesystem collaborator's concern); the default rejects it so a
    /// caller gets a typed error rather than a silent no-op.
    fn create_file_mapping(&mut self) -> AsyncResult<()> {
        Err(AsyncError::Unsupported("file mapping"))
    }
}

/// Adapts any in-memory `Read + Write + Seek` type into a [`Stream`].
pub struct GenericStream<T> {
    inner: T,
    name: String,
}

impl<T> GenericStream<T> {
    pub fn new(inner: T, name: impl Into<String>) -> Self {
        GenericStream {
            inner,
            name: name.into(),
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write + Seek + Send> Stream for GenericStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(&mut self.inner, buf)
    }
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(&mut self.inner, buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.inner)
    }
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Seek::seek(&mut self.inner, pos)
    }
    fn size(&mut self) -> io::Result<u64> {
        let current = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(current))?;
        Ok(end)
    }
    fn capabilities(&self) -> StreamCapabilities {
        StreamCapabilities {
            readable: true,
            writable: true,
            seekable: true,
        }
    }
    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Convenience alias for an in-memory [`Stream`] backed by a `Vec<u8>`.
pub type MemoryStream = GenericStream<io::Cursor<Vec<u8>>>;

/// A [`Stream`] that discards writes and reports end-of-file on every
/// read — the degenerate member of the design notes' `NullStream`
/// family, useful as a placeholder or a `/dev/null`-style sink.
pub struct NullStream {
    name: String,
}

impl NullStream {
    pub fn new(name: impl Into<String>) -> Self {
        NullStream { name: name.into() }
    }
}

impl Stream for NullStream {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Ok(0)
    }
    fn size(&mut self) -> io::Result<u64> {
        Ok(0)
    }
    fn capabilities(&self) -> StreamCapabilities {
        StreamCapabilities {
            readable: true,
            writable: true,
            seekable: true,
        }
    }
    fn name(&self) -> String {
        self.name.clone()
    }
}

type ChildId = u64;

struct NodeInner {
    parent: Option<Box<dyn Stream>>,
    active: Option<ChildId>,
    positions: HashMap<ChildId, u64>,
    next_id: ChildId,
}

struct Node {
    inner: Mutex<NodeInner>,
}

impl Node {
    /// Brings `child` up to date: if it isn't already active, save the
    /// outgoing child's position first, then seek the parent to `child`'s
    /// saved position. A no-op (and `Ok`) against a zombie node; callers
    /// that need to distinguish "did nothing because dead" from "ran"
    /// check `inner.parent.is_some()` themselves.
    fn activate(inner: &mut NodeInner, child: ChildId) -> io::Result<()> {
        if inner.active == Some(child) {
            return Ok(());
        }
        let Some(parent) = inner.parent.as_mut() else {
            return Ok(());
        };
        if let Some(outgoing) = inner.active {
            let pos = parent.stream_position()?;
            inner.positions.insert(outgoing, pos);
        }
        let target = *inner.positions.get(&child).unwrap_or(&0);
        parent.seek(SeekFrom::Start(target))?;
        inner.active = Some(child);
        Ok(())
    }
}

/// Owns the real stream. Dropping it zombifies every outstanding
/// [`ChildStream`]: their subsequent operations return benign results
/// instead of touching a freed stream.
pub struct MultiplexableStream {
    node: Arc<Node>,
}

impl MultiplexableStream {
    pub fn new(stream: Box<dyn Stream>) -> Self {
        MultiplexableStream {
            node: Arc::new(Node {
                inner: Mutex::new(NodeInner {
                    parent: Some(stream),
                    active: None,
                    positions: HashMap::new(),
                    next_id: 0,
                }),
            }),
        }
    }

    /// Creates a new cursor over the shared stream, starting at position 0.
    pub fn create_child(&self) -> ChildStream {
        let mut inner = self.node.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.positions.insert(id, 0);
        ChildStream {
            node: self.node.clone(),
            id,
        }
    }
}

impl Drop for MultiplexableStream {
    fn drop(&mut self) {
        // Zombifies every child: the node outlives us, but its `parent`
        // slot goes to `None` so children stop touching a freed stream.
        self.node.inner.lock().unwrap().parent = None;
    }
}

/// A logical cursor over a [`MultiplexableStream`]'s underlying stream.
///
/// Several children may share one parent; at most one is "active" (its
/// logical position equals the parent's actual position) at a time.
/// Operations transparently activate the calling child first.
pub struct ChildStream {
    node: Arc<Node>,
    id: ChildId,
}

impl ChildStream {
    /// Spawns a sibling cursor sharing this child's parent stream.
    pub fn create_child(&self) -> ChildStream {
        let mut inner = self.node.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.positions.insert(id, 0);
        ChildStream {
            node: self.node.clone(),
            id,
        }
    }

    /// `true` once this child's parent [`MultiplexableStream`] has been
    /// dropped. A zombie's operations are all benign no-ops.
    pub fn is_zombie(&self) -> bool {
        self.node.inner.lock().unwrap().parent.is_none()
    }

    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.node.inner.lock().unwrap();
        if inner.parent.is_none() {
            return Ok(0);
        }
        Node::activate(&mut inner, self.id)?;
        inner.parent.as_mut().unwrap().read(buf)
    }

    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.node.inner.lock().unwrap();
        if inner.parent.is_none() {
            return Ok(0);
        }
        Node::activate(&mut inner, self.id)?;
        inner.parent.as_mut().unwrap().write(buf)
    }

    pub fn get_pos(&self) -> io::Result<u64> {
        let mut inner = self.node.inner.lock().unwrap();
        if inner.parent.is_none() {
            return Ok(0);
        }
        Node::activate(&mut inner, self.id)?;
        inner.parent.as_mut().unwrap().stream_position()
    }

    pub fn set_pos(&self, pos: u64) -> io::Result<u64> {
        let mut inner = self.node.inner.lock().unwrap();
        if inner.parent.is_none() {
            return Ok(0);
        }
        Node::activate(&mut inner, self.id)?;
        inner.parent.as_mut().unwrap().seek(SeekFrom::Start(pos))
    }

    pub fn create_file_mapping(&self) -> AsyncResult<()> {
        let mut inner = self.node.inner.lock().unwrap();
        if inner.parent.is_none() {
            return Ok(());
        }
        Node::activate(&mut inner, self.id).map_err(AsyncError::SystemError)?;
        inner.parent.as_mut().unwrap().create_file_mapping()
    }

    /// Stateless: delegates straight to the parent without touching the
    /// active-child bookkeeping.
    pub fn flush(&self) -> io::Result<()> {
        let mut inner = self.node.inner.lock().unwrap();
        match inner.parent.as_mut() {
            Some(parent) => parent.flush(),
            None => Ok(()),
        }
    }

    pub fn size(&self) -> io::Result<u64> {
        let mut inner = self.node.inner.lock().unwrap();
        match inner.parent.as_mut() {
            Some(parent) => parent.size(),
            None => Ok(0),
        }
    }

    pub fn capabilities(&self) -> StreamCapabilities {
        let inner = self.node.inner.lock().unwrap();
        match inner.parent.as_ref() {
            Some(parent) => parent.capabilities(),
            None => StreamCapabilities::default(),
        }
    }

    pub fn name(&self) -> String {
        let inner = self.node.inner.lock().unwrap();
        match inner.parent.as_ref() {
            Some(parent) => parent.name(),
            None => "<dead>".to_string(),
        }
    }
}

impl Drop for ChildStream {
    fn drop(&mut self) {
        let mut inner = self.node.inner.lock().unwrap();
        inner.positions.remove(&self.id);
        if inner.active == Some(self.id) {
            inner.active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alphabet_stream() -> MultiplexableStream {
        let data = (b'a'..=b'z').collect::<Vec<u8>>();
        MultiplexableStream::new(Box::new(MemoryStream::new(
            io::Cursor::new(data),
            "alphabet",
        )))
    }

    #[test]
    fn interleaved_children_see_correct_bytes_and_positions() {
        let parent = alphabet_stream();
        let c1 = parent.create_child();
        let c2 = parent.create_child();

        let mut buf = [0u8; 3];
        assert_eq!(c1.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"abc");

        let mut buf5 = [0u8; 5];
        assert_eq!(c2.read(&mut buf5).unwrap(), 5);
        assert_eq!(&buf5, b"abcde");

        assert_eq!(c1.write(b"XY").unwrap(), 2);

        let mut buf2 = [0u8; 2];
        assert_eq!(c2.read(&mut buf2).unwrap(), 2);
        assert_eq!(&buf2, b"fg");

        assert_eq!(c1.get_pos().unwrap(), 5);
        assert_eq!(c2.get_pos().unwrap(), 7);
    }

    #[test]
    fn zombification_makes_every_operation_benign() {
        let parent = alphabet_stream();
        let child = parent.create_child();
        drop(parent);

        assert!(child.is_zombie());
        let mut buf = [0u8; 4];
        assert_eq!(child.read(&mut buf).unwrap(), 0);
        assert_eq!(child.write(b"hi").unwrap(), 0);
        assert_eq!(child.get_pos().unwrap(), 0);
        assert_eq!(child.name(), "<dead>");
        assert_eq!(child.capabilities(), StreamCapabilities::default());
    }

    #[test]
    fn set_pos_then_read_continues_from_new_position() {
        let parent = alphabet_stream();
        let child = parent.create_child();
        child.set_pos(10).unwrap();
        let mut buf = [0u8; 1];
        child.read(&mut buf).unwrap();
        assert_eq!(buf[0], b'k');
    }

    #[test]
    fn only_one_child_is_active_at_once_and_switch_saves_position() {
        let parent = alphabet_stream();
        let c1 = parent.create_child();
        let c2 = parent.create_child();

        let mut buf = [0u8; 2];
        c1.read(&mut buf).unwrap(); // c1 now active at pos 2
        c2.read(&mut buf).unwrap(); // switching activates c2, saving c1's pos 2
        assert_eq!(c1.get_pos().unwrap(), 2);
        assert_eq!(c2.get_pos().unwrap(), 2);
    }

    #[test]
    fn null_stream_discards_writes_and_reads_nothing() {
        let mut ns = NullStream::new("null");
        assert_eq!(ns.write(b"discarded").unwrap(), 9);
        let mut buf = [0u8; 4];
        assert_eq!(ns.read(&mut buf).unwrap(), 0);
    }
}
