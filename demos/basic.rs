use std::collections::BTreeMap;
use std::convert::Infallible;

use flattened_tree::{
    Children, Error, ExpansionSet, FetchSize, FlattenerOptions, Item, OffsetRequest, Page,
    TreeFlattener, TreeSource,
};
use futures::executor::block_on;

/// A synthetic directory tree: every directory holds `width` entries, down to `depth` levels.
struct Directories {
    width: usize,
    depth: usize,
}

impl TreeSource for Directories {
    type Key = String;
    type Data = usize;
    type Error = Infallible;

    async fn fetch_by_offset(
        &self,
        request: OffsetRequest<'_, String, usize>,
    ) -> Result<Page<String, usize>, Infallible> {
        let (prefix, level) = match request.parent {
            Some(p) => (format!("{p}/"), p.matches('/').count()),
            None => (String::from("/"), 0),
        };
        let end = (request.offset + request.size).min(self.width);
        let rows = (request.offset..end)
            .map(|i| Item::new(format!("{prefix}{i}"), level))
            .collect();
        Ok(Page {
            rows,
            done: end == self.width,
        })
    }

    async fn fetch_by_keys(&self, keys: &[String]) -> Result<Vec<Item<String, usize>>, Infallible> {
        Ok(keys
            .iter()
            .map(|k| Item::new(k.clone(), k.matches('/').count() - 1))
            .collect())
    }

    fn children(&self, key: &String) -> Children {
        if key.matches('/').count() < self.depth {
            Children::NonEmpty
        } else {
            Children::None
        }
    }
}

fn main() -> Result<(), Error<Infallible>> {
    let source = Directories { width: 1_000, depth: 3 };
    let mut tree = TreeFlattener::new(
        source,
        FlattenerOptions::new()
            .with_page_size(50)
            .with_expanded(ExpansionSet::all()),
    );

    block_on(async {
        let window = tree.fetch_window(0, FetchSize::Count(8)).await?;
        for row in &window.rows {
            println!("{}{}", "  ".repeat(row.tree_depth), row.key);
        }
        println!("cached={} total={:?}", tree.len(), tree.total_size());

        let it = tree.open_iterator();
        let mut per_depth = BTreeMap::new();
        for _ in 0..4 {
            let page = tree.next_page(it).await?;
            for row in &page.rows {
                *per_depth.entry(row.tree_depth).or_insert(0usize) += 1;
            }
        }
        println!("rows per depth after 4 pages: {per_depth:?}");
        println!("iterator offset={:?}", tree.iterator_offset(it));
        Ok::<(), Error<Infallible>>(())
    })
}
