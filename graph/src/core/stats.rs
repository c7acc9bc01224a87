use super::commit::Commit;

/// Summary of the history streamed so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DagStats {
    pub total_commits: usize,
    pub total_edges: usize,
    pub merge_commits: usize,
    pub root_commits: usize,
    pub leaf_commits: usize,
    /// Generation of the deepest commit
    pub max_generation: u32,
    pub has_orphans: bool,
}

impl DagStats {
    pub fn collect<'a>(commits: impl IntoIterator<Item = &'a Commit>) -> Self {
        let mut stats = DagStats::default();

        for commit in commits {
            stats.total_commits += 1;
            stats.total_edges += commit.parents().len();
            if commit.is_merge() {
                stats.merge_commits += 1;
            }
            if commit.is_root() {
                stats.root_commits += 1;
            }
            if commit.children().is_empty() {
                stats.leaf_commits += 1;
            }
            stats.max_generation = stats.max_generation.max(commit.generation());
        }

        stats.has_orphans = stats.root_commits > 1;
        stats
    }
}
