//! Normalization and merging of raw source payloads.

use std::collections::{BTreeMap, HashSet};

use crate::backend::{LibraryMovie, ProviderActor, ProviderMovie, ProviderPayload, RankingItem};

use super::{
    AggregatedResultSet, FilmographyEntry, LocalMovieRecord, MetadataKind, MetadataRecord,
    RankingEntry, SourceResult, SourceTag,
};

/// Merge raw source payloads into one aggregate.
///
/// `None` means the source was not queried (or failed) and gets no count
/// entry. Results are grouped local, rankings, provider; duplicates are only
/// removed within a source, keyed by identifier, keeping the first occurrence.
pub fn merge(
    query: &str,
    local: Option<Vec<LibraryMovie>>,
    rankings: Option<Vec<RankingItem>>,
    provider: Option<Vec<ProviderPayload>>,
) -> AggregatedResultSet {
    let mut per_source_counts = BTreeMap::new();
    let mut results = Vec::new();

    if let Some(local) = local {
        let records = dedup_by_identifier(
            local
                .into_iter()
                .map(normalize_local)
                .map(SourceResult::Local),
        );
        per_source_counts.insert(SourceTag::Local, records.len());
        results.extend(records);
    }

    if let Some(rankings) = rankings {
        let records = dedup_by_identifier(
            rankings
                .into_iter()
                .map(normalize_ranking)
                .map(SourceResult::Rankings),
        );
        per_source_counts.insert(SourceTag::Rankings, records.len());
        results.extend(records);
    }

    if let Some(provider) = provider {
        let records = dedup_by_identifier(
            provider
                .into_iter()
                .map(normalize_provider)
                .map(SourceResult::Provider),
        );
        per_source_counts.insert(SourceTag::Provider, records.len());
        results.extend(records);
    }

    AggregatedResultSet {
        query: query.to_string(),
        per_source_counts,
        results,
        warnings: Vec::new(),
        duration_ms: 0,
    }
}

/// Drop later results whose identifier was already seen. Results without an
/// identifier are always kept.
fn dedup_by_identifier(results: impl Iterator<Item = SourceResult>) -> Vec<SourceResult> {
    let mut seen = HashSet::new();
    results
        .filter(|r| {
            let id = r.identifier();
            id.is_empty() || seen.insert(id.to_string())
        })
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

fn positive_rating(rating: f64) -> Option<f64> {
    if rating.is_finite() && rating > 0.0 {
        Some(rating)
    } else {
        None
    }
}

/// Empty strings and the zero date some backends emit both mean "unknown".
fn release_date(date: String) -> Option<String> {
    non_empty(date).filter(|d| !d.starts_with("0001-01-01"))
}

fn normalize_local(movie: LibraryMovie) -> LocalMovieRecord {
    LocalMovieRecord {
        identifier: movie.code.trim().to_string(),
        title: movie.title,
        path: movie.path,
        size_bytes: movie.size.max(0) as u64,
        format: movie.format,
        actor: non_empty(movie.actress),
        fanart_url: if movie.has_fanart {
            non_empty(movie.fanart_url)
        } else {
            None
        },
    }
}

fn normalize_ranking(item: RankingItem) -> RankingEntry {
    RankingEntry {
        identifier: item.code.trim().to_string(),
        title: item.title,
        position: item.position.clamp(0, u32::MAX as i64) as u32,
        rating: item.rating.and_then(positive_rating),
        local_exists: item.local_exists,
        rank_type: item.rank_type,
        cover_url: non_empty(item.cover_url),
    }
}

fn normalize_provider(payload: ProviderPayload) -> MetadataRecord {
    match payload {
        ProviderPayload::Movie(movie) => normalize_provider_movie(movie),
        ProviderPayload::Actor(actor) => normalize_provider_actor(actor),
    }
}

fn normalize_provider_movie(movie: ProviderMovie) -> MetadataRecord {
    let identifier = movie.code.trim().to_string();
    let title = if movie.title.trim().is_empty() {
        identifier.clone()
    } else {
        movie.title
    };
    MetadataRecord {
        identifier,
        title,
        rating: positive_rating(movie.rating),
        release_date: release_date(movie.release_date),
        kind: MetadataKind::Movie,
        cover_url: non_empty(movie.cover_url),
        detail_url: non_empty(movie.detail_url),
        filmography: Vec::new(),
    }
}

fn normalize_provider_actor(actor: ProviderActor) -> MetadataRecord {
    let filmography = actor
        .movies
        .into_iter()
        .map(|m| FilmographyEntry {
            identifier: m.code.trim().to_string(),
            title: m.title,
            rating: positive_rating(m.rating),
            release_date: release_date(m.release_date),
        })
        .collect();

    let name = actor.name.trim().to_string();
    MetadataRecord {
        identifier: name.clone(),
        title: name,
        rating: None,
        release_date: None,
        kind: MetadataKind::Actor,
        cover_url: non_empty(actor.avatar_url),
        detail_url: non_empty(actor.detail_url),
        filmography,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(code: &str) -> LibraryMovie {
        LibraryMovie {
            code: code.to_string(),
            title: format!("{} title", code),
            path: format!("/media/{}.mp4", code),
            size: 1024,
            format: "mp4".to_string(),
            ..Default::default()
        }
    }

    fn ranking(code: &str, position: i64) -> RankingItem {
        RankingItem {
            code: code.to_string(),
            title: code.to_string(),
            position,
            rank_type: "daily".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_counts_match_results() {
        let merged = merge(
            "abc",
            Some(vec![local("ABC-001"), local("ABC-002")]),
            Some(vec![ranking("ABC-001", 1)]),
            Some(vec![]),
        );
        assert_eq!(merged.results.len(), 3);
        assert_eq!(merged.total(), 3);
        assert_eq!(merged.count(SourceTag::Local), 2);
        assert_eq!(merged.count(SourceTag::Rankings), 1);
        assert_eq!(merged.per_source_counts.get(&SourceTag::Provider), Some(&0));
    }

    #[test]
    fn test_merge_keeps_cross_source_duplicates() {
        let merged = merge(
            "abc",
            Some(vec![local("ABC-001")]),
            Some(vec![ranking("ABC-001", 5)]),
            None,
        );
        assert_eq!(merged.results.len(), 2);
        assert_eq!(merged.results[0].source(), SourceTag::Local);
        assert_eq!(merged.results[1].source(), SourceTag::Rankings);
    }

    #[test]
    fn test_merge_dedups_within_source_first_wins() {
        let mut second = local("ABC-001");
        second.path = "/other/ABC-001.mkv".to_string();
        let merged = merge(
            "abc",
            Some(vec![local("ABC-001"), local("ABC-002"), second]),
            None,
            None,
        );
        assert_eq!(merged.count(SourceTag::Local), 2);
        match &merged.results[0] {
            SourceResult::Local(r) => assert_eq!(r.path, "/media/ABC-001.mp4"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(merged.results[1].identifier(), "ABC-002");
    }

    #[test]
    fn test_merge_keeps_results_without_identifier() {
        let merged = merge("abc", Some(vec![local(""), local("")]), None, None);
        assert_eq!(merged.count(SourceTag::Local), 2);
    }

    #[test]
    fn test_merge_preserves_source_order() {
        let merged = merge(
            "abc",
            None,
            Some(vec![ranking("C", 3), ranking("A", 1), ranking("B", 2)]),
            None,
        );
        let ids: Vec<_> = merged.results.iter().map(|r| r.identifier()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
        assert!(!merged.per_source_counts.contains_key(&SourceTag::Local));
    }

    #[test]
    fn test_merge_all_zero_is_empty() {
        let merged = merge("nothing", Some(vec![]), Some(vec![]), Some(vec![]));
        assert!(merged.is_empty());
        assert_eq!(merged.per_source_counts.len(), 3);
    }

    #[test]
    fn test_normalize_provider_movie_optional_fields() {
        let merged = merge(
            "ABC-123",
            None,
            None,
            Some(vec![ProviderPayload::Movie(ProviderMovie {
                code: "ABC-123".to_string(),
                title: String::new(),
                rating: 0.0,
                release_date: "0001-01-01".to_string(),
                ..Default::default()
            })]),
        );
        match &merged.results[0] {
            SourceResult::Provider(r) => {
                assert_eq!(r.title, "ABC-123");
                assert_eq!(r.rating, None);
                assert_eq!(r.release_date, None);
                assert_eq!(r.cover_url, None);
                assert_eq!(r.kind, MetadataKind::Movie);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_normalize_provider_actor_counts_once() {
        let actor = ProviderActor {
            name: "Someone".to_string(),
            movie_count: 2,
            movies: vec![
                ProviderMovie {
                    code: "ABC-001".to_string(),
                    rating: 4.2,
                    release_date: "2023-05-01".to_string(),
                    ..Default::default()
                },
                ProviderMovie {
                    code: "ABC-002".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let merged = merge("Someone", None, None, Some(vec![ProviderPayload::Actor(actor)]));
        assert_eq!(merged.count(SourceTag::Provider), 1);
        match &merged.results[0] {
            SourceResult::Provider(r) => {
                assert_eq!(r.kind, MetadataKind::Actor);
                assert_eq!(r.identifier, "Someone");
                assert_eq!(r.filmography.len(), 2);
                assert_eq!(r.filmography[0].rating, Some(4.2));
                assert_eq!(r.filmography[0].release_date.as_deref(), Some("2023-05-01"));
                assert_eq!(r.filmography[1].rating, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_normalize_local_fields() {
        let mut movie = local("ABC-001");
        movie.size = -5;
        movie.actress = "  ".to_string();
        movie.fanart_url = "/fanart/1.jpg".to_string();
        movie.has_fanart = false;
        let record = normalize_local(movie);
        assert_eq!(record.size_bytes, 0);
        assert_eq!(record.actor, None);
        assert_eq!(record.fanart_url, None);
    }

    #[test]
    fn test_normalize_ranking_rating() {
        let mut item = ranking("ABC-001", -1);
        item.rating = Some(-2.0);
        let entry = normalize_ranking(item);
        assert_eq!(entry.position, 0);
        assert_eq!(entry.rating, None);
    }
}
