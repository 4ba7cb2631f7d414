//! Node side of the protocol: renders each response from a store.
//!
//! Blacklisted messages are never served. They are left out of every index
//! and count, and `/m/` treats them as absent.

use std::collections::BTreeSet;
use std::sync::Arc;

use idec_core::{BundleEntry, MsgId};
use idec_store::Store;

use crate::error::Result;
use crate::toss::TossingService;
use crate::wire::{self, EchoareaInfo};

/// Renders protocol responses over a store.
pub struct Responder<S: Store + ?Sized> {
    store: Arc<S>,
    tosser: TossingService<S>,
    /// Echoareas advertised in `list.txt`, with descriptions.
    advertised: Vec<(String, String)>,
}

impl<S: Store + ?Sized> Clone for Responder<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            tosser: self.tosser.clone(),
            advertised: self.advertised.clone(),
        }
    }
}

impl<S: Store + ?Sized> Responder<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            tosser: TossingService::new(store.clone()),
            store,
            advertised: Vec::new(),
        }
    }

    /// Advertise these echoareas (name, description) in `list.txt`.
    ///
    /// Without any, `list.txt` lists every echoarea that holds messages.
    pub fn with_echoareas(mut self, echoareas: Vec<(String, String)>) -> Self {
        self.advertised = echoareas;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Servable index of one echoarea.
    async fn servable_index(
        &self,
        echoarea: &str,
        blacklist: &BTreeSet<MsgId>,
    ) -> Result<Vec<MsgId>> {
        let index = self.store.index_for(&[echoarea.to_string()]).await?;
        Ok(index.into_iter().filter(|id| !blacklist.contains(id)).collect())
    }

    /// `GET /e/<echoarea>`
    pub async fn echoarea_index(&self, echoarea: &str) -> Result<String> {
        let blacklist = self.store.blacklist().await?;
        let index = self.servable_index(echoarea, &blacklist).await?;
        Ok(wire::render_index(&index))
    }

    /// `GET /m/<msgid>`. `None` for unknown, malformed or blacklisted ids.
    pub async fn message(&self, msgid: &str) -> Result<Option<String>> {
        let Ok(msgid) = MsgId::parse(msgid) else {
            return Ok(None);
        };
        if self.store.blacklist().await?.contains(&msgid) {
            return Ok(None);
        }
        Ok(self.store.get(&msgid).await?)
    }

    /// `GET /u/e/<e1>/.../<eN>[/<start>:<count>]`, given the path tail.
    pub async fn universal_index(&self, tail: &str) -> Result<String> {
        let (echoareas, slice) = wire::split_universal_index(tail);
        let blacklist = self.store.blacklist().await?;

        let mut sections = Vec::with_capacity(echoareas.len());
        for echoarea in echoareas {
            let index = self.servable_index(&echoarea, &blacklist).await?;
            let ids = match slice {
                Some(slice) => slice.apply(&index).to_vec(),
                None => index,
            };
            sections.push((echoarea, ids));
        }
        Ok(wire::render_universal_index(&sections))
    }

    /// `GET /u/m/<id1>/.../<idN>`, given the path tail. Unknown ids are skipped.
    pub async fn universal_bundle(&self, tail: &str) -> Result<String> {
        let blacklist = self.store.blacklist().await?;
        let mut entries = Vec::new();
        for segment in wire::split_segments(tail) {
            let Ok(msgid) = MsgId::parse(&segment) else {
                continue;
            };
            if blacklist.contains(&msgid) {
                continue;
            }
            if let Some(record) = self.store.get(&msgid).await? {
                entries.push(BundleEntry::from_record(msgid, &record));
            }
        }
        Ok(wire::render_bundle(&entries))
    }

    /// `GET /x/c/<e1>/.../<eN>`, given the path tail.
    pub async fn counts(&self, tail: &str) -> Result<String> {
        let blacklist = self.store.blacklist().await?;
        let mut counts = Vec::new();
        for echoarea in wire::split_segments(tail) {
            let count = self.servable_index(&echoarea, &blacklist).await?.len();
            counts.push((echoarea, count));
        }
        Ok(wire::render_counts(&counts))
    }

    /// Echoareas with their servable counts, for `list.txt`.
    pub async fn echoarea_list(&self) -> Result<Vec<EchoareaInfo>> {
        let advertised = if self.advertised.is_empty() {
            self.store
                .echoareas()
                .await?
                .into_iter()
                .map(|name| (name, String::new()))
                .collect()
        } else {
            self.advertised.clone()
        };

        let blacklist = self.store.blacklist().await?;
        let mut list = Vec::with_capacity(advertised.len());
        for (name, description) in advertised {
            let count = self.servable_index(&name, &blacklist).await?.len();
            list.push(EchoareaInfo {
                name,
                count,
                description,
            });
        }
        Ok(list)
    }

    /// `GET /list.txt`
    pub async fn list_txt(&self) -> Result<String> {
        Ok(wire::render_list_txt(&self.echoarea_list().await?))
    }

    /// `GET /blacklist.txt`
    pub async fn blacklist_txt(&self) -> Result<String> {
        Ok(wire::render_lines(self.store.blacklist().await?))
    }

    /// `POST /u/point` and `GET /u/point/<pauth>/<tmsg>`.
    pub async fn point_message(&self, pauth: &str, tmsg: &str) -> Result<String> {
        Ok(self.tosser.toss_encoded(pauth, tmsg).await?.to_string())
    }
}
