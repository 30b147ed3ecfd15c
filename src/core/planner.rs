//! Plan generation module.
//!
//! Coordinates the planning process for one library folder:
//! 1. Scan the folder
//! 2. Detect media items and attach subtitles
//! 3. Resolve metadata (best-effort, bounded by a timeout)
//! 4. Compute canonical destinations and subtitle decisions
//! 5. Emit operations, collision issues and empty-directory cleanup
//!
//! Planning never touches the filesystem beyond reading it.

use crate::core::detector::{Detection, Detector};
use crate::core::scanner::scan_directory;
use crate::core::subtitles::select_best;
use crate::generators::{filename as gen_filename, folder as gen_folder};
use crate::models::config::Config;
use crate::models::media::{
    ExternalId, MediaIdentity, MediaItem, MetadataQuery, ResolvedMetadata, SubtitleCandidate,
    SubtitleLanguage,
};
use crate::models::plan::{IssueKind, Operation, Plan, PlanIssue};
use crate::services::resolver::MetadataResolver;
use crate::utils::fs::ancestors_below;
use crate::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Plan format version.
pub const PLAN_VERSION: &str = "1.0";

/// Concurrent metadata lookups per plan.
const RESOLVE_CONCURRENCY: usize = 4;

/// Resolved metadata keyed by lookup query.
pub type ResolvedMap = BTreeMap<MetadataQuery, ResolvedMetadata>;

/// Plan generator.
pub struct Planner<'a, R: MetadataResolver> {
    config: &'a Config,
    resolver: &'a R,
}

impl<'a, R: MetadataResolver> Planner<'a, R> {
    pub fn new(config: &'a Config, resolver: &'a R) -> Self {
        Self { config, resolver }
    }

    /// Generate the plan for one library folder.
    ///
    /// Filesystem reads run on the blocking pool; only metadata lookups run
    /// on the async workers.
    pub async fn plan(&self, root: &Path) -> Result<Plan> {
        tracing::info!("Planning {:?}", root);

        let detection = {
            let root = root.to_path_buf();
            let config = self.config.clone();
            blocking(move || {
                let scan = scan_directory(&root, &config)?;
                Ok(Detector::new(&config, &root).detect(&scan))
            })
            .await?
        };
        let resolved = self.resolve_all(&detection.items).await;

        let plan = {
            let root = root.to_path_buf();
            let config = self.config.clone();
            blocking(move || Ok(build_plan(&root, &config, detection, &resolved))).await?
        };
        tracing::info!(
            "Planned {} operations ({} issues) for {:?}",
            plan.operations.len(),
            plan.issues.len(),
            root
        );
        Ok(plan)
    }

    /// Resolve every distinct query once. Failures and timeouts are logged
    /// and leave the query unresolved.
    pub async fn resolve_all(&self, items: &[MediaItem]) -> ResolvedMap {
        if !self.config.fetch_metadata {
            return ResolvedMap::new();
        }

        let queries: BTreeSet<MetadataQuery> = items
            .iter()
            .filter(|item| item.local_id.is_none())
            .map(MediaItem::query)
            .collect();
        if queries.is_empty() {
            return ResolvedMap::new();
        }

        let timeout = self.config.resolve_timeout();
        let timeout_secs = self.config.resolve_timeout_secs;
        tracing::debug!("Resolving {} distinct titles", queries.len());

        let results: Vec<(MetadataQuery, Option<ResolvedMetadata>)> = stream::iter(queries)
            .map(|query| async move {
                let lookup = tokio::time::timeout(timeout, self.resolver.resolve(&query));
                let resolved = match lookup.await {
                    Ok(Ok(resolved)) => resolved,
                    Ok(Err(e)) => {
                        tracing::warn!(
                            "{}",
                            crate::Error::ResolutionFailure(format!("{}: {}", query.title, e))
                        );
                        None
                    }
                    Err(_) => {
                        tracing::warn!(
                            "{} ({})",
                            crate::Error::ResolutionTimeout(timeout_secs),
                            query.title
                        );
                        None
                    }
                };
                (query, resolved)
            })
            .buffer_unordered(RESOLVE_CONCURRENCY)
            .collect()
            .await;

        results
            .into_iter()
            .filter_map(|(query, resolved)| resolved.map(|r| (query, r)))
            .collect()
    }
}

/// Run filesystem-bound work on the blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| crate::Error::other(format!("Blocking task failed: {}", e)))?
}

/// Plan a library folder. Free-function form of [`Planner::plan`].
pub async fn plan_operations<R: MetadataResolver>(
    root: &Path,
    config: &Config,
    resolver: &R,
) -> Result<Plan> {
    Planner::new(config, resolver).plan(root).await
}

/// Title, year and id used for naming one item.
struct Naming {
    title: String,
    year: Option<u16>,
    id: Option<ExternalId>,
}

fn naming_for(item: &MediaItem, resolved: &ResolvedMap) -> Naming {
    match resolved.get(&item.query()) {
        Some(meta) => Naming {
            title: meta.title.clone(),
            year: meta.year.or(item.identity.year()),
            id: Some(meta.external_id.clone()),
        },
        None => Naming {
            title: item.identity.title().to_string(),
            year: item.identity.year(),
            id: item.local_id.clone(),
        },
    }
}

/// Canonical destination of an item's video.
fn video_destination(
    root: &Path,
    item: &MediaItem,
    naming: &Naming,
    config: &Config,
) -> PathBuf {
    let quality = if config.add_quality_tag {
        item.quality.as_deref()
    } else {
        None
    };
    let extension = item.video.extension();

    match &item.identity {
        MediaIdentity::Movie { part, .. } => {
            let folder =
                gen_folder::generate_movie_folder(&naming.title, naming.year, naming.id.as_ref());
            let filename = gen_filename::generate_movie_filename(
                &naming.title,
                naming.year,
                part.as_deref(),
                quality,
                &extension,
            );
            root.join(folder).join(filename)
        }
        MediaIdentity::Episode {
            season,
            episode,
            episode_end,
            ..
        } => {
            let folder =
                gen_folder::generate_series_folder(&naming.title, naming.year, naming.id.as_ref());
            let filename = gen_filename::generate_episode_filename(
                &naming.title,
                *season,
                *episode,
                *episode_end,
                quality,
                &extension,
            );
            root.join(folder)
                .join(gen_folder::generate_season_folder(*season))
                .join(filename)
        }
    }
}

/// Operations proposed for one item or orphan group, before acceptance.
#[derive(Default)]
struct Proposal {
    moves: Vec<Operation>,
    deletes: Vec<Operation>,
}

impl Proposal {
    fn relocate(&mut self, from: &Path, to: PathBuf, reason: String) {
        if from != to {
            self.moves.push(Operation::relocate(from.to_path_buf(), to, reason));
        }
    }

    fn delete(&mut self, path: &Path, reason: String) {
        self.deletes.push(Operation::delete(path.to_path_buf(), reason));
    }
}

/// Subtitles competing for one destination slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    language: SubtitleLanguage,
    forced: bool,
    sdh: bool,
    variant: u8,
}

fn is_foreign(sub: &SubtitleCandidate, config: &Config) -> bool {
    match &sub.language {
        SubtitleLanguage::Code(code) => !config.keeps_language(code),
        SubtitleLanguage::Unknown => false,
    }
}

/// Language segment of a subtitle's new name.
fn language_segment(sub: &SubtitleCandidate, config: &Config) -> Option<String> {
    let code = sub.language.code()?;
    if sub.inferred && !config.add_language_codes {
        return None;
    }
    if !config.rename_variants && sub.variant() > 1 {
        return Some(format!("{}{}", code, sub.variant()));
    }
    Some(code.to_string())
}

/// Decide the fate of a set of subtitles that belong together.
///
/// Foreign subtitles are deleted, each language group keeps its best file
/// under `<dest_stem>.<lang>.<ext>` and the rest of the group is deleted.
/// Unknown-language losers and fully rejected groups stay in place.
fn reconcile_subtitles(
    subs: &[SubtitleCandidate],
    dest_dir: &Path,
    dest_stem: &str,
    config: &Config,
    proposal: &mut Proposal,
) {
    let mut groups: BTreeMap<GroupKey, Vec<&SubtitleCandidate>> = BTreeMap::new();

    for sub in subs {
        if config.remove_foreign_subs && !sub.is_forced() && is_foreign(sub, config) {
            proposal.delete(
                &sub.file.path,
                format!(
                    "Remove foreign subtitle ({})",
                    sub.language.code().unwrap_or_default()
                ),
            );
            continue;
        }
        let key = GroupKey {
            language: sub.language.clone(),
            forced: sub.is_forced(),
            sdh: sub.is_sdh(),
            variant: if config.rename_variants { 1 } else { sub.variant() },
        };
        groups.entry(key).or_default().push(sub);
    }

    for (key, group) in groups {
        let Some(winner) = select_best(&group) else {
            tracing::debug!(
                "No usable subtitle for {:?} in {:?}, leaving {} file(s) in place",
                key.language,
                dest_dir,
                group.len()
            );
            continue;
        };

        let extension = winner
            .tag()
            .map(|t| t.extension.clone())
            .unwrap_or_else(|| winner.file.extension());
        let filename = gen_filename::generate_subtitle_filename(
            dest_stem,
            language_segment(winner, config).as_deref(),
            key.sdh,
            key.forced,
            &extension,
        );
        proposal.relocate(
            &winner.file.path,
            dest_dir.join(filename),
            "Canonical subtitle name".to_string(),
        );

        if key.language == SubtitleLanguage::Unknown {
            continue;
        }
        for loser in group.iter().filter(|s| s.file.path != winner.file.path) {
            proposal.delete(
                &loser.file.path,
                format!("Subtitle lost deduplication to {}", winner.file.filename),
            );
        }
    }
}

/// Operations for one media item.
fn propose_item(
    root: &Path,
    item: &MediaItem,
    resolved: &ResolvedMap,
    config: &Config,
) -> Proposal {
    let naming = naming_for(item, resolved);
    let video_dest = video_destination(root, item, &naming, config);
    let dest_dir = video_dest.parent().unwrap_or(root).to_path_buf();
    let dest_stem = video_dest
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut proposal = Proposal::default();
    proposal.relocate(
        &item.video.path,
        video_dest.clone(),
        format!("Organize {}", item.identity),
    );

    for sidecar in &item.sidecars {
        proposal.relocate(
            &sidecar.path,
            dest_dir.join(format!("{}.{}", dest_stem, sidecar.extension())),
            "Follow video".to_string(),
        );
    }

    reconcile_subtitles(&item.subtitles, &dest_dir, &dest_stem, config, &mut proposal);
    proposal
}

/// Case-insensitive path equality, for renames that only change case.
fn same_path_ignoring_case(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

/// Destination of a proposal that clashes with another file, if any.
fn find_collision(proposal: &Proposal, claimed: &HashMap<PathBuf, PathBuf>) -> Option<PathBuf> {
    let own_deletes: HashSet<&Path> = proposal
        .deletes
        .iter()
        .filter_map(|op| op.from.as_deref())
        .collect();
    let mut local: HashSet<&Path> = HashSet::new();

    for op in &proposal.moves {
        let (Some(from), Some(to)) = (op.from.as_deref(), op.to.as_deref()) else {
            continue;
        };
        if claimed.get(to).is_some_and(|owner| owner != from) || !local.insert(to) {
            return Some(to.to_path_buf());
        }
        let occupied = fs::symlink_metadata(to).is_ok();
        if occupied && !own_deletes.contains(to) && !same_path_ignoring_case(from, to) {
            return Some(to.to_path_buf());
        }
    }
    None
}

/// Directories left empty once every planned move and delete has run,
/// deepest first.
fn empty_directories(
    root: &Path,
    leaving: &HashSet<PathBuf>,
    incoming: &HashSet<PathBuf>,
) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = leaving
        .iter()
        .flat_map(|path| ancestors_below(path, root))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    candidates.sort_by(|a, b| {
        b.components()
            .count()
            .cmp(&a.components().count())
            .then_with(|| a.cmp(b))
    });

    let mut removed: HashSet<PathBuf> = HashSet::new();
    let mut result = Vec::new();

    for dir in candidates {
        if incoming.iter().any(|p| p.starts_with(&dir)) {
            continue;
        }
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        let all_leaving = entries.filter_map(|e| e.ok()).all(|entry| {
            let path = entry.path();
            leaving.contains(&path) || removed.contains(&path)
        });
        if all_leaving {
            removed.insert(dir.clone());
            result.push(dir);
        }
    }

    result
}

/// Build a plan from detector output and resolved metadata.
///
/// Items are processed in video-path order, so when two items want the same
/// destination the later one is reported as a collision.
pub fn build_plan(
    root: &Path,
    config: &Config,
    detection: Detection,
    resolved: &ResolvedMap,
) -> Plan {
    let mut issues = Vec::new();

    // Identities claimed by more than one video are skipped.
    let mut by_key: BTreeMap<String, Vec<MediaItem>> = BTreeMap::new();
    for item in detection.items {
        by_key.entry(item.identity.key()).or_default().push(item);
    }
    let mut items = Vec::new();
    for (_, mut group) in by_key {
        if group.len() == 1 {
            items.extend(group.pop());
            continue;
        }
        let names: Vec<String> = group.iter().map(|i| i.video.filename.clone()).collect();
        for item in &group {
            let err = crate::Error::Ambiguity(format!(
                "{} matches {} videos: {}",
                item.identity,
                group.len(),
                names.join(", ")
            ));
            tracing::warn!("{}", err);
            issues.push(PlanIssue {
                kind: IssueKind::Ambiguity,
                path: item.video.path.clone(),
                message: err.to_string(),
            });
        }
    }
    items.sort_by(|a, b| a.video.path.cmp(&b.video.path));

    let mut orphan_groups: BTreeMap<(PathBuf, String), Vec<SubtitleCandidate>> = BTreeMap::new();
    for orphan in detection.orphans {
        let base = orphan
            .tag()
            .map(|t| t.base.clone())
            .unwrap_or_else(|| orphan.file.stem());
        orphan_groups
            .entry((orphan.file.parent_dir().to_path_buf(), base))
            .or_default()
            .push(orphan);
    }

    let mut proposals: Vec<(PathBuf, Proposal)> = items
        .iter()
        .map(|item| (item.video.path.clone(), propose_item(root, item, resolved, config)))
        .collect();
    for ((dir, base), subs) in &orphan_groups {
        let mut proposal = Proposal::default();
        reconcile_subtitles(subs, dir, base, config, &mut proposal);
        if let Some(first) = subs.first() {
            proposals.push((first.file.path.clone(), proposal));
        }
    }

    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut moves = Vec::new();
    let mut deletes = Vec::new();

    for (subject, proposal) in proposals {
        if let Some(target) = find_collision(&proposal, &claimed) {
            let err = crate::Error::Collision(format!(
                "{} -> {:?} is already taken",
                subject.display(),
                target
            ));
            tracing::warn!("{}", err);
            issues.push(PlanIssue {
                kind: IssueKind::Collision,
                path: subject,
                message: err.to_string(),
            });
            continue;
        }
        for op in &proposal.moves {
            if let (Some(from), Some(to)) = (&op.from, &op.to) {
                claimed.insert(to.clone(), from.clone());
            }
        }
        moves.extend(proposal.moves);
        deletes.extend(proposal.deletes);
    }

    let mut leaving: HashSet<PathBuf> = HashSet::new();
    let mut incoming: HashSet<PathBuf> = HashSet::new();
    let mut to_create: BTreeSet<PathBuf> = BTreeSet::new();

    for op in &moves {
        if let (Some(from), Some(to)) = (&op.from, &op.to) {
            leaving.insert(from.clone());
            incoming.insert(to.clone());
            for dir in ancestors_below(to, root) {
                if !dir.is_dir() {
                    to_create.insert(dir);
                }
            }
        }
    }
    leaving.extend(deletes.iter().filter_map(|op| op.from.clone()));
    incoming.extend(to_create.iter().cloned());

    // Deletes that free a destination must run before the moves.
    let (early_deletes, late_deletes): (Vec<Operation>, Vec<Operation>) = deletes
        .into_iter()
        .partition(|op| op.from.as_ref().is_some_and(|p| claimed.contains_key(p)));

    let mut operations: Vec<Operation> = to_create
        .into_iter()
        .map(|dir| Operation::create_directory(dir, "Destination folder"))
        .collect();
    operations.extend(early_deletes);
    operations.extend(moves);
    operations.extend(late_deletes);
    operations.extend(
        empty_directories(root, &leaving, &incoming)
            .into_iter()
            .map(|dir| Operation::delete(dir, "Directory left empty")),
    );

    Plan {
        version: PLAN_VERSION.to_string(),
        created_at: Utc::now().to_rfc3339(),
        root: root.to_path_buf(),
        operations,
        issues,
    }
}

/// Save a plan to a JSON file.
pub fn save_plan(plan: &Plan, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(plan)?;

    // Create parent directory if needed
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::File::create(path)?;
    file.write_all(json.as_bytes())?;

    tracing::info!("Plan saved to {:?}", path);
    Ok(())
}

/// Load a plan from a JSON file.
pub fn load_plan(path: &Path) -> Result<Plan> {
    let content = fs::read_to_string(path)?;
    let plan: Plan = serde_json::from_str(&content)?;
    Ok(plan)
}

/// Get the default plan output path inside the library folder.
pub fn default_plan_path(root: &Path) -> PathBuf {
    let filename = format!("plan_{}.json", Utc::now().format("%Y%m%d_%H%M%S"));
    root.join(filename)
}
