mod docs;

use alloy_primitives::Address;
use async_trait::async_trait;
use bridge_errors::StorageError;
use bridge_primitives::{AnchorTx, BlockAnchor, BracketingAnchors, EvmMatch, Transfer, WatchedAddress};
use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::options::{FindOneOptions, IndexOptions, InsertManyOptions};
use mongodb::{Client, Collection, Database, IndexModel};

use crate::traits::InsertOutcome;

const MONGO_DUPLICATE_KEY_CODE: i32 = 11000;

/// MongoDB-backed implementation of [`crate::Storage`]. The driver's native
/// `insert_many(..., ordered(false))` + unique-index duplicate-key reporting
/// maps directly onto the persistence contract's duplicate-tolerant batch
/// insert, so this is a thin translation layer rather than an abstraction
/// over an abstraction.
#[derive(Debug, Clone)]
pub struct MongoStorage {
    transfers: Collection<Document>,
    anchors: Collection<Document>,
    watched: Collection<Document>,
}

impl MongoStorage {
    /// Connect to `url` and select the fixed collection names this crate
    /// owns. Does not verify indexes — call [`crate::Storage::ensure_indexes`]
    /// once at startup before serving any traffic.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let client = Client::with_uri_str(url).await.map_err(|e| StorageError::Connection(e.to_string()))?;
        let db: Database = client.default_database().unwrap_or_else(|| client.database("bridge_correlator"));
        Ok(Self {
            transfers: db.collection("transfers"),
            anchors: db.collection("anchor_txs"),
            watched: db.collection("watched_addresses"),
        })
    }

    async fn insert_batch(
        &self,
        collection: &Collection<Document>,
        docs: Vec<Document>,
    ) -> Result<InsertOutcome, StorageError> {
        if docs.is_empty() {
            return Ok(InsertOutcome::default());
        }
        let total = docs.len() as u64;
        let opts = InsertManyOptions::builder().ordered(false).build();
        match collection.insert_many(docs).with_options(opts).await {
            Ok(result) => Ok(InsertOutcome { inserted: result.inserted_ids.len() as u64, duplicates: 0 }),
            Err(err) => match &*err.kind {
                ErrorKind::InsertMany(insert_err) => {
                    let inserted = insert_err.inserted_ids.len() as u64;
                    let write_errors = insert_err.write_errors.clone().unwrap_or_default();
                    let non_duplicate: Vec<_> =
                        write_errors.iter().filter(|e| e.code != MONGO_DUPLICATE_KEY_CODE).collect();
                    if !non_duplicate.is_empty() {
                        return Err(StorageError::Query(format!(
                            "batch insert failed with non-duplicate write errors: {non_duplicate:?}"
                        )));
                    }
                    let duplicates = total - inserted;
                    Ok(InsertOutcome { inserted, duplicates })
                }
                _ => Err(StorageError::Query(err.to_string())),
            },
        }
    }
}

#[async_trait]
impl crate::Storage for MongoStorage {
    async fn ensure_indexes(&self) -> Result<(), StorageError> {
        let unique = |keys: Document| IndexModel::builder().keys(keys).options(IndexOptions::builder().unique(true).build()).build();
        let plain = |keys: Document| IndexModel::builder().keys(keys).build();

        self.transfers
            .create_index(unique(doc! { docs::transfer_fields::CORE_HASH: 1 }))
            .await
            .map_err(|e| StorageError::IndexVerification(format!("transfers.coreHash: {e}")))?;
        self.transfers
            .create_index(plain(doc! { docs::transfer_fields::STATUS: 1, docs::transfer_fields::CORE_TIME: 1 }))
            .await
            .map_err(|e| StorageError::IndexVerification(format!("transfers.status+coreTime: {e}")))?;

        self.anchors
            .create_index(unique(doc! { docs::anchor_fields::INTERNAL_HASH: 1 }))
            .await
            .map_err(|e| StorageError::IndexVerification(format!("anchor_txs.internalHash: {e}")))?;
        self.anchors
            .create_index(plain(doc! { docs::anchor_fields::BLOCK_TIMESTAMP: 1 }))
            .await
            .map_err(|e| StorageError::IndexVerification(format!("anchor_txs.blockTimestamp: {e}")))?;
        self.anchors
            .create_index(plain(doc! {
                docs::anchor_fields::FROM: 1,
                docs::anchor_fields::ASSET_RECIPIENT: 1,
                docs::anchor_fields::AMOUNT_SMALLEST_UNIT: 1,
                docs::anchor_fields::BLOCK_TIMESTAMP: 1,
            }))
            .await
            .map_err(|e| StorageError::IndexVerification(format!("anchor_txs.match-tuple: {e}")))?;

        self.watched
            .create_index(unique(doc! { docs::watched_fields::ADDRESS: 1 }))
            .await
            .map_err(|e| StorageError::IndexVerification(format!("watched_addresses.address: {e}")))?;

        Ok(())
    }

    async fn insert_transfer_batch(&self, transfers: Vec<Transfer>) -> Result<InsertOutcome, StorageError> {
        let docs = transfers.iter().map(docs::transfer_to_doc).collect();
        self.insert_batch(&self.transfers, docs).await
    }

    async fn get_pending_transfers(&self, limit: usize) -> Result<Vec<Transfer>, StorageError> {
        let filter = doc! { docs::transfer_fields::STATUS: "PENDING" };
        let opts = mongodb::options::FindOptions::builder()
            .sort(doc! { docs::transfer_fields::CORE_TIME: 1 })
            .limit(limit as i64)
            .build();
        let mut cursor =
            self.transfers.find(filter).with_options(opts).await.map_err(|e| StorageError::Query(e.to_string()))?;
        let mut out = Vec::with_capacity(limit);
        while let Some(doc) = cursor.try_next().await.map_err(|e| StorageError::Query(e.to_string()))? {
            out.push(docs::doc_to_transfer(doc)?);
        }
        Ok(out)
    }

    async fn get_pending_count(&self) -> Result<u64, StorageError> {
        let filter = doc! { docs::transfer_fields::STATUS: "PENDING" };
        self.transfers.count_documents(filter).await.map_err(|e| StorageError::Query(e.to_string()))
    }

    async fn mark_matched(&self, core_hash: &str, evm: EvmMatch) -> Result<(), StorageError> {
        use docs::transfer_fields::*;
        let filter = doc! { CORE_HASH: core_hash, STATUS: "PENDING" };
        let update = doc! { "$set": {
            STATUS: "MATCHED",
            EVM_INTERNAL_HASH: format!("{:#x}", evm.internal_hash),
            EVM_EXPLORER_HASH: format!("{:#x}", evm.explorer_hash),
            EVM_BLOCK_NUMBER: evm.block_number as i64,
            EVM_BLOCK_HASH: format!("{:#x}", evm.block_hash),
            EVM_BLOCK_TIME: evm.block_time as i64,
            CONTRACT_ADDRESS: evm.contract_address.map(|a| format!("{a:#x}")),
        }};
        self.transfers.update_one(filter, update).await.map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(())
    }

    async fn mark_failed(&self, core_hash: &str, reason: String) -> Result<(), StorageError> {
        use docs::transfer_fields::*;
        let filter = doc! { CORE_HASH: core_hash, STATUS: "PENDING" };
        let update = doc! { "$set": { STATUS: "FAILED", FAIL_REASON: reason } };
        self.transfers.update_one(filter, update).await.map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(())
    }

    async fn insert_anchor_tx_batch(&self, anchors: Vec<AnchorTx>) -> Result<InsertOutcome, StorageError> {
        let docs = anchors.iter().map(docs::anchor_to_doc).collect();
        self.insert_batch(&self.anchors, docs).await
    }

    async fn find_bracketing_anchors(&self, target_time: u64) -> Result<BracketingAnchors, StorageError> {
        let target_time = target_time as i64;
        let ts = docs::anchor_fields::BLOCK_TIMESTAMP;

        let before_filter = doc! { ts: { "$lte": target_time } };
        let before_opts = FindOneOptions::builder().sort(doc! { ts: -1 }).build();
        let before = self
            .anchors
            .find_one(before_filter)
            .with_options(before_opts)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?
            .map(docs::doc_to_anchor)
            .transpose()?
            .map(|a| a.as_bracket());

        let after_filter = doc! { ts: { "$gt": target_time } };
        let after_opts = FindOneOptions::builder().sort(doc! { ts: 1 }).build();
        let after = self
            .anchors
            .find_one(after_filter)
            .with_options(after_opts)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?
            .map(docs::doc_to_anchor)
            .transpose()?
            .map(|a| a.as_bracket());

        Ok(BracketingAnchors { before, after })
    }

    async fn find_matching_anchor(
        &self,
        from: Address,
        asset_recipient: Address,
        amount_smallest_unit: &str,
        min_time: u64,
        max_time: u64,
    ) -> Result<Option<AnchorTx>, StorageError> {
        use docs::anchor_fields::*;
        let filter = doc! {
            FROM: format!("{from:#x}"),
            ASSET_RECIPIENT: format!("{asset_recipient:#x}"),
            AMOUNT_SMALLEST_UNIT: amount_smallest_unit,
            BLOCK_TIMESTAMP: { "$gte": min_time as i64, "$lte": max_time as i64 },
        };
        let opts = FindOneOptions::builder().sort(doc! { BLOCK_TIMESTAMP: 1 }).build();
        self.anchors
            .find_one(filter)
            .with_options(opts)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?
            .map(docs::doc_to_anchor)
            .transpose()
    }

    async fn get_watched_addresses(&self) -> Result<Vec<WatchedAddress>, StorageError> {
        let mut cursor = self.watched.find(doc! {}).await.map_err(|e| StorageError::Query(e.to_string()))?;
        let mut out = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(|e| StorageError::Query(e.to_string()))? {
            out.push(docs::doc_to_watched(doc)?);
        }
        Ok(out)
    }

    async fn upsert_watched_address(&self, watched: WatchedAddress) -> Result<(), StorageError> {
        let filter = doc! { docs::watched_fields::ADDRESS: format!("{:#x}", watched.address) };
        let update = doc! { "$setOnInsert": docs::watched_to_doc(&watched) };
        let opts = mongodb::options::UpdateOptions::builder().upsert(true).build();
        self.watched.update_one(filter, update).with_options(opts).await.map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(())
    }

    async fn update_cursor(&self, address: Address, last_indexed_time: u64) -> Result<(), StorageError> {
        let filter = doc! { docs::watched_fields::ADDRESS: format!("{address:#x}") };
        let update = doc! { "$set": { docs::watched_fields::LAST_INDEXED_TIME: last_indexed_time as i64 } };
        self.watched.update_one(filter, update).await.map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(())
    }
}
