use anyhow::Result;
use git2::{Commit, Oid, Repository, Signature};
use graph::{CommitRegistry, GraphQuery, LogReader, SystemRunner};
use std::process::Command;
use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn create_test_repo() -> Result<(TempDir, Repository)> {
    let dir = TempDir::new()?;
    let repo = Repository::init(dir.path())?;

    let mut config = repo.config()?;
    config.set_str("user.name", "Test User")?;
    config.set_str("user.email", "test@example.com")?;

    Ok((dir, repo))
}

fn commit_to_repo(repo: &Repository, message: &str, parents: &[&Commit], update_ref: Option<&str>) -> Result<Oid> {
    let sig = Signature::now("Test User", "test@example.com")?;
    let tree_id = {
        let mut index = repo.index()?;
        index.write_tree()?
    };
    let tree = repo.find_tree(tree_id)?;

    Ok(repo.commit(update_ref, &sig, &sig, message, &tree, parents)?)
}

/// base <- left <- merge, base <- right <- merge, base tagged v1.0
fn merge_history(repo: &Repository) -> Result<[Oid; 4]> {
    let base = commit_to_repo(repo, "Base commit", &[], Some("HEAD"))?;
    let base_commit = repo.find_commit(base)?;
    repo.tag_lightweight("v1.0", base_commit.as_object(), false)?;

    let left = commit_to_repo(repo, "Left", &[&base_commit], Some("HEAD"))?;
    let right = commit_to_repo(repo, "Right", &[&base_commit], None)?;
    let left_commit = repo.find_commit(left)?;
    let right_commit = repo.find_commit(right)?;

    let merge = commit_to_repo(repo, "Merge", &[&left_commit, &right_commit], Some("HEAD"))?;
    Ok([base, left, right, merge])
}

fn reader_for(dir: &TempDir, reference: &str, count: usize) -> LogReader<SystemRunner> {
    LogReader::new(
        GraphQuery::new(reference, count),
        CommitRegistry::new(),
        SystemRunner::in_dir(dir.path()),
    )
}

#[test]
fn streams_a_real_history() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let (dir, repo) = create_test_repo()?;
    let [base, left, right, merge] = merge_history(&repo)?;

    let mut reader = reader_for(&dir, "HEAD", 100);
    let handles = reader.by_ref().collect::<graph::Result<Vec<_>>>()?;
    assert_eq!(handles.len(), 4);
    assert!(reader.is_cached());

    // every parent is streamed before its children
    for (position, &handle) in handles.iter().enumerate() {
        let commit = reader.commit(handle).unwrap();
        for parent in commit.parents() {
            let parent_position = handles.iter().position(|h| h == parent).unwrap();
            assert!(parent_position < position);
        }
    }

    let base = reader.get(&base.to_string())?;
    let merge_commit = reader.get(&merge.to_string())?;
    assert_eq!(base.generation(), 0);
    assert_eq!(reader.get(&left.to_string())?.generation(), 1);
    assert_eq!(reader.get(&right.to_string())?.generation(), 1);
    assert_eq!(merge_commit.generation(), 2);
    assert_eq!(base.children().len(), 2);

    assert_eq!(base.tags().collect::<Vec<_>>(), vec!["v1.0"]);
    let head = repo.head()?;
    let branch = head.shorthand().unwrap();
    assert_eq!(merge_commit.tags().collect::<Vec<_>>(), vec![branch]);
    assert_eq!(merge_commit.subject(), Some("Merge"));
    assert_eq!(merge_commit.author(), Some("Test User"));
    assert!(merge_commit.authored_at().is_some());

    Ok(())
}

#[test]
fn count_limits_to_the_most_recent_commits() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let (dir, repo) = create_test_repo()?;
    let [base, _, _, merge] = merge_history(&repo)?;

    let mut reader = reader_for(&dir, "HEAD", 2);
    let handles = reader.by_ref().collect::<graph::Result<Vec<_>>>()?;
    assert_eq!(handles.len(), 2);
    assert_eq!(reader.commit(handles[1]).unwrap().id(), merge.to_string());

    // parents outside the window only exist as placeholders
    let base = base.to_string();
    let placeholder = reader.registry().find(&base).unwrap();
    assert!(!reader.registry().commit(placeholder).unwrap().is_parsed());
    assert!(reader.get(&base).is_err());

    Ok(())
}

#[test]
fn unknown_ref_yields_an_empty_history() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let (dir, repo) = create_test_repo()?;
    merge_history(&repo)?;

    let mut reader = reader_for(&dir, "no-such-ref", 10);
    assert_eq!(reader.next_commit()?, None);
    assert!(reader.is_cached());
    assert!(reader.is_empty());

    Ok(())
}

#[test]
fn changing_the_ref_rereads_history() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let (dir, repo) = create_test_repo()?;
    merge_history(&repo)?;

    let mut reader = reader_for(&dir, "HEAD", 100);
    assert_eq!(reader.by_ref().count(), 4);

    reader.query_mut().set_ref("v1.0");
    reader.restart();
    let handles = reader.by_ref().collect::<graph::Result<Vec<_>>>()?;
    assert_eq!(handles.len(), 1);
    assert_eq!(reader.commit(handles[0]).unwrap().subject(), Some("Base commit"));

    Ok(())
}
