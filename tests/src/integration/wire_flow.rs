//! # Framed Batches over the Repo Protocol
//!
//! The wire client only ever sends one-operation messages; these tests
//! drive `serve_repo_stream` with hand-built frames to cover the batch
//! semantics the frame format allows.

#[cfg(test)]
mod tests {
    use chronicle_store::{BlockSource, MemoryBlockStore};
    use chronicle_transact::wire::framing::{read_frame, write_frame, MAX_FRAME_BYTES};
    use chronicle_transact::{serve_repo_stream, TransactError, Transactor};
    use serde_json::json;
    use shared_types::{
        Block, BlockGet, BlockType, CollectionId, KeyedMutex, OperationResult, PendPolicy,
        PendRequest, RepoMessage, RepoOperation, RepoResponse, Transform, TrxId,
    };
    use std::sync::Arc;
    use tokio::io::AsyncWriteExt;

    fn transactor() -> Arc<Transactor<MemoryBlockStore>> {
        let store = Arc::new(MemoryBlockStore::new(CollectionId::from("ledger")));
        Arc::new(Transactor::new(store, Arc::new(KeyedMutex::new())))
    }

    async fn exchange(
        transactor: Arc<Transactor<MemoryBlockStore>>,
        message: RepoMessage,
    ) -> RepoResponse {
        let (mut client, mut server) = tokio::io::duplex(64 * 1024);
        let handle = tokio::spawn(async move { serve_repo_stream(&*transactor, &mut server).await });
        write_frame(&mut client, &message).await.expect("write");
        let response: RepoResponse = read_frame(&mut client).await.expect("read");
        handle.await.expect("join").expect("serve");
        response
    }

    #[tokio::test]
    async fn test_batch_runs_in_order_and_isolates_faults() {
        let transactor = transactor();
        let header = transactor
            .store()
            .create_block_header(BlockType::from("LOG"), None);
        let block_id = header.id.clone();
        let mut transform = Transform::new();
        transform.insert(Block::new(header).with_field("entries", json!(["a"])));

        let message = RepoMessage {
            operations: vec![
                RepoOperation::Pend(PendRequest {
                    transform,
                    trx_id: TrxId::generate(),
                    rev: 0,
                    policy: PendPolicy::Continue,
                }),
                // Empty transform: a fault, answered in place.
                RepoOperation::Pend(PendRequest {
                    transform: Transform::new(),
                    trx_id: TrxId::generate(),
                    rev: 0,
                    policy: PendPolicy::Continue,
                }),
                RepoOperation::Get(vec![BlockGet {
                    block_id: block_id.clone(),
                    context: None,
                }]),
            ],
            expiration: None,
        };

        let response = exchange(transactor, message).await;

        assert_eq!(response.results.len(), 3);
        assert!(matches!(response.results[0], OperationResult::Pend(_)));
        assert!(matches!(response.results[1], OperationResult::Error(_)));
        // The pend was not committed, so the get answers with absence.
        match &response.results[2] {
            OperationResult::Get(results) => {
                assert_eq!(results[0].block_id, block_id);
                assert!(results[0].block.is_none());
            }
            other => panic!("expected get result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expired_message_fails_every_operation() {
        let transactor = transactor();
        let message = RepoMessage {
            operations: vec![
                RepoOperation::Get(vec![]),
                RepoOperation::Cancel(shared_types::TrxRef {
                    block_ids: vec![],
                    trx_id: TrxId::from("t1"),
                    rev: 0,
                }),
            ],
            // Long past; every operation sees the deadline.
            expiration: Some(1),
        };

        let response = exchange(transactor, message).await;

        assert_eq!(response.results.len(), 2);
        for result in &response.results {
            assert!(matches!(result, OperationResult::Error(_)));
        }
    }

    #[tokio::test]
    async fn test_server_surfaces_oversized_frames_as_transport_errors() {
        let transactor = transactor();
        let (mut client, mut server) = tokio::io::duplex(1024);

        let declared = (MAX_FRAME_BYTES as u32) + 1;
        client
            .write_all(&declared.to_be_bytes())
            .await
            .expect("write prefix");

        let err = serve_repo_stream(&*transactor, &mut server)
            .await
            .expect_err("oversized");
        assert!(matches!(err, TransactError::FrameTooLarge { .. }));
    }
}
