//! Frequency-first clustering of project names
//!
//! The whole batch must be seen at once: names are processed most frequent
//! first (shorter first among equals), each joins the first cluster whose
//! anchor is similar, otherwise it anchors a new cluster. A cluster's anchor
//! is its first member and never changes, so rare typos attach to the
//! dominant spelling rather than to each other.

use std::collections::HashMap;

use tracing::debug;

use crate::canonical::NameForm;
use crate::similarity::are_similar;

/// Raw name -> canonical display label.
pub type CanonicalMap = HashMap<String, String>;

/// Label written back for empty or null-like project values.
pub const NULL_LABEL: &str = "None";

const NULL_LIKE: &[&str] = &["none", "nan", "null"];

/// One distinct name and how often it appeared in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameObservation {
    pub name: String,
    pub count: usize,
}

/// Raw names judged to denote the same entity.
#[derive(Debug, Clone)]
pub struct ProjectCluster {
    anchor: NameForm,
    members: Vec<NameForm>,
}

impl ProjectCluster {
    fn new(anchor: NameForm) -> Self {
        Self {
            members: vec![anchor.clone()],
            anchor,
        }
    }

    fn accepts(&self, candidate: &NameForm) -> bool {
        are_similar(&candidate.key, &self.anchor.key, &candidate.raw, &self.anchor.raw)
    }

    /// First member ever added; used for every comparison.
    pub fn anchor(&self) -> &NameForm {
        &self.anchor
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.raw.as_str())
    }

    /// Best representative: frequent, unprefixed, no generic tail, short.
    ///
    /// Ties keep the earliest member.
    fn representative(&self, counts: &HashMap<&str, usize>) -> &NameForm {
        let mut best = &self.members[0];
        let mut best_score = candidate_score(best, counts);
        for member in &self.members[1..] {
            let score = candidate_score(member, counts);
            if score > best_score {
                best = member;
                best_score = score;
            }
        }
        best
    }

    /// Display label chosen for every member of the cluster.
    pub fn canonical_label(&self, counts: &HashMap<&str, usize>) -> String {
        let best = self.representative(counts);
        let label = if best.display.is_empty() {
            best.raw.clone()
        } else {
            best.display.clone()
        };
        capitalize_if_lowercase(&label)
    }
}

fn candidate_score(form: &NameForm, counts: &HashMap<&str, usize>) -> i64 {
    let freq = counts.get(form.raw.as_str()).copied().unwrap_or(1) as i64;
    let length = if form.display.is_empty() {
        form.raw.chars().count()
    } else {
        form.display.chars().count()
    } as i64;
    let prefix_penalty = if form.has_prefix { 20 } else { 0 };
    let tail_penalty = if form.has_generic_tail() { 25 } else { 0 };

    freq * 100 - prefix_penalty - tail_penalty - length
}

/// "data lake" -> "Data lake"; anything with an upper-case letter is kept.
fn capitalize_if_lowercase(label: &str) -> String {
    let has_lower = label.chars().any(char::is_lowercase);
    let has_upper = label.chars().any(char::is_uppercase);
    if !has_lower || has_upper {
        return label.to_string();
    }

    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Empty, "none", "nan" and "null" (any case) carry no project.
pub fn is_null_like(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || NULL_LIKE.contains(&trimmed.to_lowercase().as_str())
}

/// Counts distinct trimmed names, in first-seen order.
pub fn count_observations<I, S>(raw_names: I) -> Vec<NameObservation>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut observations: Vec<NameObservation> = Vec::new();

    for raw in raw_names {
        let name = raw.as_ref().trim();
        if is_null_like(name) {
            continue;
        }
        match index.get(name) {
            Some(&pos) => observations[pos].count += 1,
            None => {
                index.insert(name.to_string(), observations.len());
                observations.push(NameObservation {
                    name: name.to_string(),
                    count: 1,
                });
            }
        }
    }

    observations
}

fn build_clusters(observations: &[NameObservation]) -> Vec<ProjectCluster> {
    let mut ordered: Vec<&NameObservation> = observations.iter().collect();
    // stable: equal (count, length) keep first-seen order
    ordered.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.name.chars().count().cmp(&b.name.chars().count()))
    });

    let mut clusters: Vec<ProjectCluster> = Vec::new();
    for observation in ordered {
        let form = NameForm::new(&observation.name);
        if form.key.is_empty() {
            clusters.push(ProjectCluster::new(form));
            continue;
        }
        match clusters.iter_mut().find(|cluster| cluster.accepts(&form)) {
            Some(cluster) => cluster.members.push(form),
            None => clusters.push(ProjectCluster::new(form)),
        }
    }
    clusters
}

/// Builds the raw name -> canonical label map for a whole batch.
///
/// The map covers every distinct non-null-like value (trimmed). Names whose
/// key folds to nothing ("Implementation") never merge with anything and
/// keep their own display form.
///
/// ```
/// use unify::build_canonical_map;
///
/// let map = build_canonical_map(["CRM", "CRM Migration", "crm migration", "None", ""]);
/// assert_eq!(map.len(), 3);
/// assert_eq!(map["CRM"], map["crm migration"]);
/// assert!(!map.contains_key("None"));
/// ```
pub fn build_canonical_map<I, S>(raw_names: I) -> CanonicalMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let observations = count_observations(raw_names);
    if observations.is_empty() {
        return CanonicalMap::new();
    }

    let counts: HashMap<&str, usize> = observations
        .iter()
        .map(|o| (o.name.as_str(), o.count))
        .collect();
    let clusters = build_clusters(&observations);

    let mut mapping = CanonicalMap::with_capacity(observations.len());
    for cluster in &clusters {
        let label = cluster.canonical_label(&counts);
        for member in cluster.members() {
            mapping.insert(member.to_string(), label.clone());
        }
    }

    debug!(
        "🔗 Unified {} distinct project names into {} clusters",
        observations.len(),
        clusters.len()
    );

    mapping
}

/// Rewrites one value: null-like becomes "None", unknown names pass through.
pub fn apply_canonical(map: &CanonicalMap, value: &str) -> String {
    if is_null_like(value) {
        return NULL_LABEL.to_string();
    }
    let trimmed = value.trim();
    map.get(trimmed)
        .cloned()
        .unwrap_or_else(|| trimmed.to_string())
}

/// Builds the map over `values` and rewrites them in place.
pub fn unify_in_place(values: &mut [String]) -> CanonicalMap {
    let map = build_canonical_map(values.iter());
    for value in values.iter_mut() {
        *value = apply_canonical(&map, value);
    }
    map
}
