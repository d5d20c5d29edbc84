// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Selection fixtures shared by the read/write and list suites.

use normcache::{Field, Selection};

/// List name used by the friends fixtures.
pub const FRIENDS_LIST: &str = "Friends";

/// `{ id firstName }` on `User`.
pub fn user_fields() -> Selection {
    Selection::new()
        .field("id", Field::scalar("id", "ID"))
        .field("firstName", Field::scalar("firstName", "String"))
}

/// `{ viewer { id firstName } }`
pub fn viewer_selection() -> Selection {
    Selection::new().field("viewer", Field::object("viewer", "User", user_fields()))
}

/// `{ viewer { id firstName friends @list(name: "Friends") { id firstName } } }`
pub fn friends_selection() -> Selection {
    let viewer = user_fields().field(
        "friends",
        Field::object("friends", "User", user_fields()).with_list(FRIENDS_LIST, false),
    );
    Selection::new().field("viewer", Field::object("viewer", "User", viewer))
}

/// `{ nodes { __typename id ... } }` on the abstract `Node` type, with
/// `firstName` for users and `title` for posts.
pub fn node_selection() -> Selection {
    let fields = Selection::new()
        .field("__typename", Field::scalar("__typename", "String"))
        .field("id", Field::scalar("id", "ID"))
        .field("firstName", Field::scalar("firstName", "String").nullable())
        .field("title", Field::scalar("title", "String").nullable());
    Selection::new().field("nodes", Field::abstract_object("nodes", "Node", fields))
}

/// `{ viewer { id friends(first: 10) @list(name: "Friends", connection) { edges { node { id firstName } } } } }`
pub fn connection_selection() -> Selection {
    let node = Selection::new().field("node", Field::object("node", "User", user_fields()));
    let edges = Selection::new().field("edges", Field::object("edges", "UserEdge", node));
    let viewer = Selection::new()
        .field("id", Field::scalar("id", "ID"))
        .field(
            "friends",
            Field::object("friends(first: 10)", "UserConnection", edges)
                .with_list(FRIENDS_LIST, true),
        );
    Selection::new().field("viewer", Field::object("viewer", "User", viewer))
}
