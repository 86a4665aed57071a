use std::{cell::Cell, collections::HashSet};

use chrono::NaiveDate;
use claims::{assert_none, assert_some, assert_some_eq};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::all_ids;
use super::proptest_arb::{arb_forest, arb_forest_and_id};

use crate::model::{
    repository::album::{
        contains, delete_by_id, find_by_id, insert_child, path_to, remove_in_place, update_by_id,
        update_in_place,
    },
    Album, AlbumId,
};

fn album(id: &str, children: Vec<Album>) -> Album {
    Album {
        id: id.into(),
        title: format!("Album {}", id),
        publisher_name: "Publisher".to_owned(),
        publish_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        cover_image: String::new(),
        media: Vec::new(),
        albums: children,
        is_locked: false,
        password_hash: None,
    }
}

/// 1 ─ 2 ─ 3
///   └ 4
/// 5
fn sample_forest() -> Vec<Album> {
    vec![
        album(
            "1",
            vec![album("2", vec![album("3", vec![])]), album("4", vec![])],
        ),
        album("5", vec![]),
    ]
}

fn subtree_ids(album: &Album) -> HashSet<AlbumId> {
    let mut ids = HashSet::new();
    album.walk(&mut |a| {
        ids.insert(a.id.clone());
    });
    ids
}

fn retitle(album: &Album) -> Album {
    Album {
        title: format!("{} (edited)", album.title),
        ..album.clone()
    }
}

#[test]
fn find_descends_into_nested_and_locked_albums() {
    let mut forest = sample_forest();
    forest[0].is_locked = true;
    forest[0].password_hash = Some("digest".to_owned());
    let found = assert_some!(find_by_id(&forest, &"3".into()));
    assert_eq!(found.title, "Album 3");
    assert_none!(find_by_id(&forest, &"missing".into()));
}

#[test]
fn path_to_nested_album() {
    let forest = sample_forest();
    let path = assert_some!(path_to(&forest, &"3".into()));
    let ids: Vec<&str> = path.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_none!(path_to(&forest, &"missing".into()));
}

#[test]
fn delete_nested_album_keeps_siblings() {
    let forest = sample_forest();
    let result = delete_by_id(&forest, &"2".into());
    assert_eq!(
        all_ids(&result),
        vec![AlbumId::from("1"), AlbumId::from("4"), AlbumId::from("5")]
    );
    // input untouched
    assert_eq!(forest, sample_forest());
}

#[test]
fn delete_root_album() {
    let result = delete_by_id(&sample_forest(), &"1".into());
    assert_eq!(all_ids(&result), vec![AlbumId::from("5")]);
}

#[test]
fn update_replaces_node_and_keeps_its_children() {
    let forest = sample_forest();
    let result = update_by_id(&forest, &"2".into(), retitle);
    let updated = assert_some!(find_by_id(&result, &"2".into()));
    assert_eq!(updated.title, "Album 2 (edited)");
    assert_eq!(updated.albums, forest[0].albums[0].albums);
    assert_eq!(result[0].albums[1], forest[0].albums[1]);
    assert_eq!(result[1], forest[1]);
}

#[test]
fn updater_is_not_called_on_miss() {
    let calls = Cell::new(0);
    let forest = sample_forest();
    let result = update_by_id(&forest, &"missing".into(), |a| {
        calls.set(calls.get() + 1);
        a.clone()
    });
    assert_eq!(calls.get(), 0);
    assert_eq!(result, forest);
}

#[test]
fn insert_child_appends_to_parent() {
    let forest = sample_forest();
    let result = assert_some!(insert_child(&forest, &"2".into(), album("6", vec![])));
    let parent = assert_some!(find_by_id(&result, &"2".into()));
    let child_ids: Vec<&str> = parent.albums.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(child_ids, vec!["3", "6"]);
    assert_none!(insert_child(&forest, &"missing".into(), album("6", vec![])));
}

#[test]
fn in_place_variants() {
    let mut forest = sample_forest();
    assert!(update_in_place(&mut forest, &"4".into(), |a| {
        a.title = "Four".to_owned()
    }));
    assert!(!update_in_place(&mut forest, &"missing".into(), |_| {}));
    assert_some_eq!(
        find_by_id(&forest, &"4".into()).map(|a| a.title.as_str()),
        "Four"
    );
    let removed = assert_some!(remove_in_place(&mut forest, &"2".into()));
    assert_eq!(removed.id, AlbumId::from("2"));
    assert!(!contains(&forest, &"3".into()));
    assert_none!(remove_in_place(&mut forest, &"2".into()));
}

proptest! {
    #[test]
    fn prop_miss_is_noop(forest in arb_forest()) {
        let missing = AlbumId::from("not-an-id");
        prop_assert_eq!(&update_by_id(&forest, &missing, retitle), &forest);
        prop_assert_eq!(&delete_by_id(&forest, &missing), &forest);
    }

    #[test]
    fn prop_find_every_album_at_any_depth(forest in arb_forest()) {
        let mut expected: Vec<Album> = Vec::new();
        for root in &forest {
            root.walk(&mut |a| expected.push(a.clone()));
        }
        for album in expected {
            let found = find_by_id(&forest, &album.id);
            prop_assert_eq!(found, Some(&album));
        }
    }

    #[test]
    fn prop_delete_removes_exactly_the_subtree((forest, id) in arb_forest_and_id()) {
        let target = find_by_id(&forest, &id).unwrap().clone();
        let removed = subtree_ids(&target);
        let result = delete_by_id(&forest, &id);
        let before: HashSet<AlbumId> = all_ids(&forest).into_iter().collect();
        let after: HashSet<AlbumId> = all_ids(&result).into_iter().collect();
        let expected: HashSet<AlbumId> = before.difference(&removed).cloned().collect();
        prop_assert_eq!(after, expected);
    }

    #[test]
    fn prop_update_only_touches_path((forest, id) in arb_forest_and_id()) {
        let target = find_by_id(&forest, &id).unwrap().clone();
        let ancestors: HashSet<AlbumId> = path_to(&forest, &id)
            .unwrap()
            .into_iter()
            .map(|a| a.id.clone())
            .collect();
        let result = update_by_id(&forest, &id, retitle);
        let expected = retitle(&target);
        prop_assert_eq!(find_by_id(&result, &id), Some(&expected));
        prop_assert_eq!(all_ids(&result), all_ids(&forest));
        for other in all_ids(&forest).into_iter().filter(|i| !ancestors.contains(i)) {
            prop_assert_eq!(find_by_id(&result, &other), find_by_id(&forest, &other));
        }
    }
}
