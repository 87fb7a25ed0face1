//! Identity matching against a known-face gallery.
//!
//! Embeddings are L2-normalized upstream, so the dot product is the cosine
//! similarity. Each face is matched independently; several faces may resolve
//! to the same name.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::constants::UNKNOWN_SUBJECT;
use crate::inference::error::InferenceError;

const UNIT_NORM_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub name: String,
    pub embedding: Vec<f32>,
}

/// Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn new(entries: Vec<GalleryEntry>) -> Result<Self, InferenceError> {
        if let Some(first) = entries.first() {
            let expected = first.embedding.len();
            if expected == 0 {
                return Err(InferenceError::InvalidEmbeddingDimension {
                    expected: 1,
                    actual: 0,
                });
            }
            for entry in &entries {
                if entry.name.trim().is_empty() {
                    return Err(InferenceError::InvalidConfig(
                        "gallery entry name must not be empty".to_string(),
                    ));
                }
                if entry.embedding.len() != expected {
                    return Err(InferenceError::InvalidEmbeddingDimension {
                        expected,
                        actual: entry.embedding.len(),
                    });
                }
                if !is_finite(&entry.embedding) {
                    return Err(InferenceError::NonFiniteEmbedding);
                }
                let norm = dot(&entry.embedding, &entry.embedding).sqrt();
                if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
                    // 非单位向量时相似度不再是余弦值
                    tracing::warn!(name = %entry.name, norm, "Gallery embedding is not L2-normalized");
                }
            }
        }
        Ok(Self { entries })
    }

    /// Loads `[{"name": ..., "embedding": [...]}]`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let entries: Vec<GalleryEntry> = serde_json::from_str(&raw)?;
        let gallery = Self::new(entries)?;
        tracing::info!(
            path = %path.as_ref().display(),
            entries = gallery.len(),
            "Gallery loaded"
        );
        Ok(gallery)
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|e| e.embedding.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityMatch {
    /// Gallery name, or `"unknown"` below threshold.
    pub name: String,
    /// Best similarity seen, accepted or not.
    pub similarity: f32,
    pub matched: bool,
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn is_finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}

#[derive(Debug, Clone)]
pub struct IdentityMatcher {
    gallery: Arc<Gallery>,
    threshold: f32,
}

impl IdentityMatcher {
    pub fn new(gallery: Arc<Gallery>, threshold: f32) -> Self {
        Self { gallery, threshold }
    }

    pub fn best_match(&self, query: &[f32]) -> Result<IdentityMatch, InferenceError> {
        let expected = self.gallery.dimension().ok_or(InferenceError::EmptyGallery)?;
        if query.len() != expected {
            return Err(InferenceError::InvalidEmbeddingDimension {
                expected,
                actual: query.len(),
            });
        }
        if !is_finite(query) {
            return Err(InferenceError::NonFiniteEmbedding);
        }

        let mut best: Option<(&GalleryEntry, f32)> = None;
        for entry in self.gallery.entries() {
            let sim = dot(&entry.embedding, query);
            // 严格大于：相同分数保留先出现的条目
            if best.map_or(true, |(_, b)| sim > b) {
                best = Some((entry, sim));
            }
        }
        let Some((entry, similarity)) = best else {
            return Err(InferenceError::EmptyGallery);
        };

        let matched = similarity > self.threshold;
        Ok(IdentityMatch {
            name: if matched {
                entry.name.clone()
            } else {
                UNKNOWN_SUBJECT.to_string()
            },
            similarity,
            matched,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub name: String,
    pub present: bool,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub entries: Vec<AttendanceEntry>,
    pub total: usize,
    pub present_count: usize,
    pub absent_count: usize,
    /// Faces that matched nobody.
    pub unknown_faces: u64,
}

/// 会话级考勤：记录每个图库成员的最高匹配分数
#[derive(Debug, Clone, Default)]
pub struct AttendanceRoster {
    best: BTreeMap<String, f32>,
    unknown_faces: u64,
}

impl AttendanceRoster {
    pub fn record(&mut self, m: &IdentityMatch) {
        if !m.matched {
            self.unknown_faces += 1;
            return;
        }
        let best = self.best.entry(m.name.clone()).or_insert(m.similarity);
        if m.similarity > *best {
            *best = m.similarity;
        }
    }

    /// Every gallery name, present or not, then names seen before a reload removed them.
    pub fn report(&self, gallery: &Gallery) -> AttendanceReport {
        let mut seen = BTreeSet::new();
        let mut entries = Vec::with_capacity(gallery.len());
        for entry in gallery.entries() {
            if !seen.insert(entry.name.as_str()) {
                continue;
            }
            let best = self.best.get(&entry.name).copied();
            entries.push(AttendanceEntry {
                name: entry.name.clone(),
                present: best.is_some(),
                confidence: best.unwrap_or(0.0),
            });
        }
        for (name, confidence) in &self.best {
            if !seen.contains(name.as_str()) {
                entries.push(AttendanceEntry {
                    name: name.clone(),
                    present: true,
                    confidence: *confidence,
                });
            }
        }

        let present_count = entries.iter().filter(|e| e.present).count();
        AttendanceReport {
            total: entries.len(),
            present_count,
            absent_count: entries.len() - present_count,
            unknown_faces: self.unknown_faces,
            entries,
        }
    }
}

/// Shared gallery: readers clone an `Arc` snapshot, reloads swap it whole.
#[derive(Debug, Default)]
pub struct GalleryStore {
    current: RwLock<Arc<Gallery>>,
}

impl GalleryStore {
    pub fn new(gallery: Gallery) -> Self {
        Self {
            current: RwLock::new(Arc::new(gallery)),
        }
    }

    pub fn snapshot(&self) -> Arc<Gallery> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn matcher(&self, threshold: f32) -> IdentityMatcher {
        IdentityMatcher::new(self.snapshot(), threshold)
    }

    /// Validates `entries` and replaces the gallery; on error the old one stays.
    pub fn reload(&self, entries: Vec<GalleryEntry>) -> Result<usize, InferenceError> {
        let gallery = Arc::new(Gallery::new(entries)?);
        let len = gallery.len();
        match self.current.write() {
            Ok(mut guard) => *guard = gallery,
            Err(poisoned) => *poisoned.into_inner() = gallery,
        }
        tracing::info!(entries = len, "Gallery reloaded");
        Ok(len)
    }

    pub fn reload_from_file(&self, path: impl AsRef<Path>) -> Result<usize, InferenceError> {
        let gallery = Gallery::load_json(path)?;
        self.reload(gallery.entries)
    }
}
