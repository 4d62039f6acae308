use std::cell::RefCell;
use std::collections::BTreeMap;
use std::convert::Infallible;

use flattened_tree::{
    Children, Error, ExpansionSet, FetchSize, FlattenerOptions, InsertPosition, Item, Mutation,
    OffsetRequest, Page, SourceEvent, TreeChange, TreeFlattener, TreeSource,
};
use futures::executor::block_on;

#[derive(Default)]
struct Outline {
    children: RefCell<BTreeMap<Option<&'static str>, Vec<&'static str>>>,
}

impl Outline {
    fn add(&self, parent: Option<&'static str>, key: &'static str) -> usize {
        let mut children = self.children.borrow_mut();
        let list = children.entry(parent).or_default();
        list.push(key);
        list.len() - 1
    }
}

impl TreeSource for Outline {
    type Key = &'static str;
    type Data = String;
    type Error = Infallible;

    async fn fetch_by_offset(
        &self,
        request: OffsetRequest<'_, &'static str, String>,
    ) -> Result<Page<&'static str, String>, Infallible> {
        let children = self.children.borrow();
        let list = children
            .get(&request.parent.copied())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let end = (request.offset + request.size).min(list.len());
        let start = request.offset.min(end);
        Ok(Page {
            rows: list[start..end]
                .iter()
                .map(|&k| Item::new(k, k.to_uppercase()))
                .collect(),
            done: end == list.len(),
        })
    }

    async fn fetch_by_keys(
        &self,
        keys: &[&'static str],
    ) -> Result<Vec<Item<&'static str, String>>, Infallible> {
        Ok(keys.iter().map(|&k| Item::new(k, k.to_uppercase())).collect())
    }

    fn children(&self, key: &&'static str) -> Children {
        match self.children.borrow().get(&Some(*key)) {
            Some(list) if !list.is_empty() => Children::NonEmpty,
            Some(_) => Children::Empty,
            None => Children::None,
        }
    }
}

fn print(tree: &TreeFlattener<Outline>) {
    for row in tree.rows() {
        let marker = if row.is_leaf {
            " "
        } else if tree.expanded().contains(&row.key) {
            "-"
        } else {
            "+"
        };
        println!("{}{marker} {}", "  ".repeat(row.tree_depth), row.data);
    }
    println!();
}

fn main() -> Result<(), Error<Infallible>> {
    let outline = Outline::default();
    for chapter in ["intro", "usage", "faq"] {
        outline.add(None, chapter);
    }
    for section in ["install", "configure", "run"] {
        outline.add(Some("usage"), section);
    }
    outline.add(Some("configure"), "env");

    let mut tree = TreeFlattener::new(outline, FlattenerOptions::new());
    tree.subscribe(|change| match change {
        TreeChange::Mutate(m) => println!(
            "  [{} added, {} removed, {} updated]",
            m.added().count(),
            m.removed().count(),
            m.updated().count()
        ),
        TreeChange::Refresh(scope) => println!("  [refresh {scope:?}]"),
    });

    block_on(async {
        tree.fetch_window(0, FetchSize::All).await?;
        print(&tree);

        tree.set_expanded(ExpansionSet::explicit(["usage", "configure"]))
            .await?;
        print(&tree);

        let index = tree.source().add(Some("usage"), "troubleshoot");
        let mutation = Mutation::default().with_added(
            "troubleshoot",
            Some("usage"),
            "TROUBLESHOOT".to_string(),
            InsertPosition::Index(index),
        );
        tree.handle_event(SourceEvent::Mutate(mutation)).await?;
        print(&tree);

        tree.set_expanded(tree.expanded().without(&"usage")).await?;
        print(&tree);
        Ok::<(), Error<Infallible>>(())
    })
}
