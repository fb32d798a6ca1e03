use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tandem_node::PeerNode;
use tandem_store::{ChunkRef, FsNode};
use tandem_types::{Codec, ContentId};

use crate::error::{FsError, FsResult};

/// A readable file.
///
/// Nothing is fetched until the stream is polled. Each call to
/// [`stream`](Self::stream) starts again from the first chunk.
#[derive(Clone, Debug)]
pub struct Cat {
    node: Arc<PeerNode>,
    root: ContentId,
}

enum Cursor {
    Root,
    Chunks(std::vec::IntoIter<ChunkRef>),
    Done,
}

impl Cat {
    pub(crate) fn new(node: Arc<PeerNode>, root: ContentId) -> Self {
        Self { node, root }
    }

    pub fn cid(&self) -> &ContentId {
        &self.root
    }

    /// The file's chunks, in order. A single-block file yields one chunk.
    pub fn stream(&self) -> BoxStream<'static, FsResult<Bytes>> {
        let node = Arc::clone(&self.node);
        let root = self.root;
        stream::try_unfold(Cursor::Root, move |cursor| {
            let node = Arc::clone(&node);
            async move {
                match cursor {
                    Cursor::Root => {
                        let block = node.resolve_block(&root).await?;
                        match block.codec() {
                            Codec::Raw => Ok(Some((block.into_data(), Cursor::Done))),
                            Codec::DagJson => match FsNode::from_block(&block)? {
                                FsNode::File { chunks, .. } => {
                                    next_chunk(&node, &root, chunks.into_iter()).await
                                }
                                FsNode::Directory { .. } => Err(FsError::NotAFile(root)),
                            },
                        }
                    }
                    Cursor::Chunks(rest) => next_chunk(&node, &root, rest).await,
                    Cursor::Done => Ok(None),
                }
            }
        })
        .boxed()
    }

    /// Read the whole file into memory.
    pub async fn read_to_end(&self) -> FsResult<Bytes> {
        self.stream()
            .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok(buf)
            })
            .await
            .map(BytesMut::freeze)
    }
}

async fn next_chunk(
    node: &PeerNode,
    root: &ContentId,
    mut rest: std::vec::IntoIter<ChunkRef>,
) -> FsResult<Option<(Bytes, Cursor)>> {
    let Some(chunk) = rest.next() else {
        return Ok(None);
    };
    let data = node.resolve(&chunk.cid).await?;
    if data.len() as u64 != chunk.size {
        return Err(FsError::CorruptFile {
            cid: *root,
            reason: format!(
                "chunk {} is {} bytes, manifest says {}",
                chunk.cid,
                data.len(),
                chunk.size
            ),
        });
    }
    Ok(Some((data, Cursor::Chunks(rest))))
}
