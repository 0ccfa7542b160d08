/// Dependencies Module
///
/// The graph of dependencies (foreign keys) between the tables of all
/// registered schemas. Rebuilt from live introspection on every `load`, then
/// serves structural queries (parents, children, ancestors, descendants)
/// purely from memory. The delete/drop/populate machinery above this layer
/// relies on these orderings for correctness.
use crate::core::db::connection::{Connection, QueryOptions};
use crate::core::db::cursor::{Row, SqlValue};
use crate::core::{DataLinkError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// A graph node: a fully qualified table, or a synthetic alias node standing
/// for one specific renamed foreign-key path between two tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Node {
    Table(String),
    Alias(u64),
}

impl Node {
    pub fn is_alias(&self) -> bool {
        matches!(self, Node::Alias(_))
    }
}

/// Metadata carried by every dependency edge.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    /// Ordered referencing-column to referenced-column mapping. Order is
    /// significant for composite keys.
    pub attr_map: Vec<(String, String)>,
    /// All referencing columns are part of the referencing table's primary
    /// key: the relationship participates in identity.
    pub primary: bool,
    /// At least one referencing column name differs from the referenced
    /// column it maps to.
    pub aliased: bool,
    /// The referencing columns are a strict subset of the referencing
    /// table's primary key: the key does not fully determine identity.
    pub multi: bool,
}

/// The foreign-key dependency DAG.
///
/// Nodes are fully qualified table names carrying their primary-key column
/// set; edges run referenced → referencing. An aliased relationship inserts
/// two edges with identical metadata through a fresh alias node, so multiple
/// renamed paths between the same pair of tables stay distinguishable.
#[derive(Debug, Default)]
pub struct Dependencies {
    nodes: BTreeMap<Node, BTreeSet<String>>,
    edges: Vec<(Node, Node, ForeignKey)>,
    out_edges: BTreeMap<Node, Vec<usize>>,
    in_edges: BTreeMap<Node, Vec<usize>>,
    alias_count: u64,
    loaded: bool,
}

impl Dependencies {
    pub fn new() -> Self {
        Dependencies::default()
    }

    /// True once a `load` has completed successfully.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Number of table nodes.
    pub fn table_count(&self) -> usize {
        self.nodes.keys().filter(|n| !n.is_alias()).count()
    }

    /// Number of synthetic alias nodes.
    pub fn alias_node_count(&self) -> usize {
        self.nodes.keys().filter(|n| n.is_alias()).count()
    }

    /// Number of edges, counting both halves of an aliased relationship.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Primary-key columns of a table node, if present.
    pub fn primary_key(&self, table_name: &str) -> Option<&BTreeSet<String>> {
        self.nodes.get(&Node::Table(table_name.to_string()))
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.out_edges.clear();
        self.in_edges.clear();
        self.alias_count = 0;
        self.loaded = false;
    }

    /// Rebuilds the graph from live schema introspection.
    ///
    /// The graph is wiped first (including the alias counter) so renamed
    /// relationships cannot leave duplicate or stale alias nodes behind
    /// across reloads. A cyclic foreign-key structure is a fatal schema
    /// design error: the graph is left empty and unqueryable.
    pub fn load(&mut self, conn: &mut Connection) -> Result<()> {
        self.clear();

        // Primary keys per table; hidden tables (~ prefix) are excluded by
        // the introspection queries themselves.
        let pk_sql = conn.primary_key_query()?;
        let mut cursor = conn.execute(&pk_sql, &[], QueryOptions::default())?;
        let mut pks: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in cursor.fetch_all() {
            let table = text_field(&row, 0)?;
            let column = text_field(&row, 1)?;
            pks.entry(table).or_default().insert(column);
        }
        for (table, pk) in pks {
            self.insert_table(&table, pk);
        }

        // Foreign keys, grouped by constraint identity with column pairs in
        // declaration order.
        let fk_sql = conn.foreign_key_query()?;
        let mut cursor = conn.execute(&fk_sql, &[], QueryOptions::default())?;
        let mut order: Vec<(String, String, String)> = Vec::new();
        let mut groups: HashMap<(String, String, String), Vec<(String, Option<String>)>> =
            HashMap::new();
        for row in cursor.fetch_all() {
            let constraint = text_field(&row, 0)?;
            let referencing = text_field(&row, 1)?;
            let referenced = text_field(&row, 2)?;
            let column = text_field(&row, 3)?;
            let referenced_column = match row.get(4) {
                Some(SqlValue::Null) | None => None,
                Some(value) => Some(
                    value
                        .as_str()
                        .ok_or_else(|| malformed_row(&row))?
                        .to_string(),
                ),
            };
            let key = (constraint, referencing, referenced);
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups
                .entry(key)
                .or_default()
                .push((column, referenced_column));
        }

        for key in order {
            let columns = groups.remove(&key).unwrap_or_default();
            let (_, referencing, referenced) = key;
            let attr_map = columns
                .into_iter()
                .map(|(from, to)| {
                    let to = match to {
                        Some(to) => to,
                        // An implicit reference targets the parent's primary
                        // key; only a single-column key is unambiguous.
                        None => self.implicit_target(&referenced)?,
                    };
                    Ok((from, to))
                })
                .collect::<Result<Vec<_>>>()?;
            self.insert_foreign_key(&referencing, &referenced, attr_map);
        }

        if !self.is_acyclic() {
            self.clear();
            return Err(DataLinkError::Schema(
                "cyclic dependencies between tables are not supported".to_string(),
            ));
        }
        self.loaded = true;
        Ok(())
    }

    pub(crate) fn insert_table(&mut self, name: &str, primary_key: BTreeSet<String>) {
        self.nodes.insert(Node::Table(name.to_string()), primary_key);
    }

    /// Inserts one foreign-key relationship, computing its metadata against
    /// the referencing table's primary key. Aliased relationships go through
    /// a fresh alias node as two edges with identical metadata.
    pub(crate) fn insert_foreign_key(
        &mut self,
        referencing: &str,
        referenced: &str,
        attr_map: Vec<(String, String)>,
    ) {
        let referencing = Node::Table(referencing.to_string());
        let referenced = Node::Table(referenced.to_string());
        // Tables outside the registered schemas may appear as endpoints;
        // they get a node with no primary-key information.
        self.nodes.entry(referencing.clone()).or_default();
        self.nodes.entry(referenced.clone()).or_default();

        let pk = self.nodes.get(&referencing).cloned().unwrap_or_default();
        let columns: BTreeSet<String> = attr_map.iter().map(|(from, _)| from.clone()).collect();
        let fk = ForeignKey {
            primary: columns.is_subset(&pk),
            aliased: attr_map.iter().any(|(from, to)| from != to),
            multi: columns.is_subset(&pk) && columns != pk,
            attr_map,
        };

        if !fk.aliased {
            self.add_edge(referenced, referencing, fk);
        } else {
            let alias = Node::Alias(self.alias_count);
            self.alias_count += 1;
            self.nodes.insert(alias.clone(), BTreeSet::new());
            self.add_edge(referenced, alias.clone(), fk.clone());
            self.add_edge(alias, referencing, fk);
        }
    }

    fn add_edge(&mut self, from: Node, to: Node, fk: ForeignKey) {
        let index = self.edges.len();
        self.out_edges.entry(from.clone()).or_default().push(index);
        self.in_edges.entry(to.clone()).or_default().push(index);
        self.edges.push((from, to, fk));
    }

    fn implicit_target(&self, referenced: &str) -> Result<String> {
        let pk = self.primary_key(referenced).ok_or_else(|| {
            DataLinkError::Schema(format!(
                "foreign key references unknown table {}",
                referenced
            ))
        })?;
        if pk.len() == 1 {
            Ok(pk.iter().next().cloned().unwrap_or_default())
        } else {
            Err(DataLinkError::Schema(format!(
                "cannot resolve implicit foreign key against composite key of {}",
                referenced
            )))
        }
    }

    fn table_node(&self, table_name: &str) -> Result<Node> {
        let node = Node::Table(table_name.to_string());
        if self.nodes.contains_key(&node) {
            Ok(node)
        } else {
            Err(DataLinkError::Schema(format!(
                "unknown table {}",
                table_name
            )))
        }
    }

    /// Tables referenced by the foreign keys of `table_name` (one entry per
    /// relationship; a parent reached through two aliased paths appears
    /// twice). With `primary` set, only edges whose `primary` flag matches
    /// are considered.
    pub fn parents(
        &self,
        table_name: &str,
        primary: Option<bool>,
    ) -> Result<Vec<(String, &ForeignKey)>> {
        let node = self.table_node(table_name)?;
        let mut result = Vec::new();
        if let Some(edge_ids) = self.in_edges.get(&node) {
            for &index in edge_ids {
                let (from, _, fk) = &self.edges[index];
                if primary.is_some_and(|p| fk.primary != p) {
                    continue;
                }
                if let Some(name) = self.resolve_toward_source(from) {
                    result.push((name, fk));
                }
            }
        }
        Ok(result)
    }

    /// Tables referencing `table_name` through foreign keys; symmetric to
    /// [`Dependencies::parents`].
    pub fn children(
        &self,
        table_name: &str,
        primary: Option<bool>,
    ) -> Result<Vec<(String, &ForeignKey)>> {
        let node = self.table_node(table_name)?;
        let mut result = Vec::new();
        if let Some(edge_ids) = self.out_edges.get(&node) {
            for &index in edge_ids {
                let (_, to, fk) = &self.edges[index];
                if primary.is_some_and(|p| fk.primary != p) {
                    continue;
                }
                if let Some(name) = self.resolve_toward_target(to) {
                    result.push((name, fk));
                }
            }
        }
        Ok(result)
    }

    /// The table itself followed by all dependent tables in topological
    /// order: every table appears after all of its own ancestors, which is
    /// the order safe deletion walks top-down through dependents.
    pub fn descendants(&self, table_name: &str) -> Result<Vec<String>> {
        let start = self.table_node(table_name)?;
        let closure = self.reachable(&start, true);
        let mut result = vec![table_name.to_string()];
        result.extend(self.topo_order(&closure).into_iter().filter_map(table_name_of));
        Ok(result)
    }

    /// The table itself followed by all referenced tables in reverse
    /// topological order, supporting safe top-down creation and insertion.
    pub fn ancestors(&self, table_name: &str) -> Result<Vec<String>> {
        let start = self.table_node(table_name)?;
        let closure = self.reachable(&start, false);
        let mut order = self.topo_order(&closure);
        order.reverse();
        let mut result = vec![table_name.to_string()];
        result.extend(order.into_iter().filter_map(table_name_of));
        Ok(result)
    }

    /// Follows an alias node back to the real table it stands in for.
    fn resolve_toward_source(&self, node: &Node) -> Option<String> {
        match node {
            Node::Table(name) => Some(name.clone()),
            Node::Alias(_) => {
                let index = *self.in_edges.get(node)?.first()?;
                match &self.edges[index].0 {
                    Node::Table(name) => Some(name.clone()),
                    Node::Alias(_) => None,
                }
            }
        }
    }

    fn resolve_toward_target(&self, node: &Node) -> Option<String> {
        match node {
            Node::Table(name) => Some(name.clone()),
            Node::Alias(_) => {
                let index = *self.out_edges.get(node)?.first()?;
                match &self.edges[index].1 {
                    Node::Table(name) => Some(name.clone()),
                    Node::Alias(_) => None,
                }
            }
        }
    }

    /// All nodes reachable from `start` (exclusive) following edges forward
    /// or backward.
    fn reachable(&self, start: &Node, forward: bool) -> BTreeSet<Node> {
        let adjacency = if forward {
            &self.out_edges
        } else {
            &self.in_edges
        };
        let mut seen: BTreeSet<Node> = BTreeSet::new();
        let mut queue: VecDeque<Node> = VecDeque::from([start.clone()]);
        while let Some(node) = queue.pop_front() {
            if let Some(edge_ids) = adjacency.get(&node) {
                for &index in edge_ids {
                    let (from, to, _) = &self.edges[index];
                    let next = if forward { to } else { from };
                    if next != start && seen.insert(next.clone()) {
                        queue.push_back(next.clone());
                    }
                }
            }
        }
        seen
    }

    /// Kahn's algorithm over the subgraph induced by `subset`, with
    /// lexicographic tie-breaking for deterministic output.
    fn topo_order(&self, subset: &BTreeSet<Node>) -> Vec<Node> {
        let mut indegree: BTreeMap<&Node, usize> =
            subset.iter().map(|node| (node, 0)).collect();
        for (from, to, _) in &self.edges {
            if subset.contains(from) {
                if let Some(degree) = indegree.get_mut(to) {
                    *degree += 1;
                }
            }
        }

        let mut ready: BTreeSet<&Node> = indegree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&node, _)| node)
            .collect();
        let mut order = Vec::with_capacity(subset.len());
        while let Some(node) = ready.pop_first() {
            order.push(node.clone());
            if let Some(edge_ids) = self.out_edges.get(node) {
                for &index in edge_ids {
                    let (_, to, _) = &self.edges[index];
                    if let Some(degree) = indegree.get_mut(to) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert(to);
                        }
                    }
                }
            }
        }
        order
    }

    fn is_acyclic(&self) -> bool {
        let all: BTreeSet<Node> = self.nodes.keys().cloned().collect();
        self.topo_order(&all).len() == all.len()
    }
}

fn table_name_of(node: Node) -> Option<String> {
    match node {
        Node::Table(name) => Some(name),
        Node::Alias(_) => None,
    }
}

fn text_field(row: &Row, index: usize) -> Result<String> {
    row.get(index)
        .and_then(|value| value.as_str())
        .map(String::from)
        .ok_or_else(|| malformed_row(row))
}

fn malformed_row(row: &Row) -> DataLinkError {
    DataLinkError::Schema(format!("malformed introspection row: {:?}", row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::connection::{Port, Schema, TlsPolicy};

    fn connect(ddl: &str) -> Connection {
        let mut conn = Connection::new(
            ":memory:",
            "tester",
            "",
            Some(Port::Embedded),
            None,
            TlsPolicy::default(),
        )
        .unwrap();
        conn.register(Schema::new("main"));
        for statement in ddl.split(';') {
            let statement = statement.trim();
            if !statement.is_empty() {
                conn.query(statement).unwrap();
            }
        }
        conn
    }

    fn full(name: &str) -> String {
        format!("`main`.`{}`", name)
    }

    #[test]
    fn test_chain_descendants_and_ancestors() {
        // Same-name references keep the graph alias-free
        let mut conn = connect(
            "CREATE TABLE a (id INTEGER PRIMARY KEY);
             CREATE TABLE b (id INTEGER PRIMARY KEY, FOREIGN KEY (id) REFERENCES a(id));
             CREATE TABLE c (id INTEGER PRIMARY KEY, FOREIGN KEY (id) REFERENCES b(id))",
        );
        conn.load_dependencies().unwrap();

        let graph = conn.dependencies();
        assert!(graph.is_loaded());
        assert_eq!(graph.alias_node_count(), 0);

        let descendants = graph.descendants(&full("a")).unwrap();
        assert_eq!(descendants, vec![full("a"), full("b"), full("c")]);

        let ancestors = graph.ancestors(&full("c")).unwrap();
        assert_eq!(ancestors[0], full("c"));
        // Reversed, the ancestor list is the topological order of the closure
        let mut reversed = ancestors.clone();
        reversed.reverse();
        assert_eq!(reversed, vec![full("a"), full("b"), full("c")]);
    }

    #[test]
    fn test_parents_children_and_flags() {
        let mut conn = connect(
            "CREATE TABLE session (id INTEGER PRIMARY KEY);
             CREATE TABLE trial (
                 id INTEGER,
                 seq INTEGER,
                 PRIMARY KEY (id, seq),
                 FOREIGN KEY (id) REFERENCES session(id));
             CREATE TABLE note (
                 note_id INTEGER PRIMARY KEY,
                 id INTEGER,
                 FOREIGN KEY (id) REFERENCES session(id))",
        );
        conn.load_dependencies().unwrap();
        let graph = conn.dependencies();

        // trial's FK is part of a larger primary key: primary and multi
        let trial_parents = graph.parents(&full("trial"), None).unwrap();
        assert_eq!(trial_parents.len(), 1);
        let (parent, fk) = &trial_parents[0];
        assert_eq!(parent, &full("session"));
        assert!(fk.primary);
        assert!(fk.multi);
        assert!(!fk.aliased);

        // note's FK is entirely outside its primary key
        let note_parents = graph.parents(&full("note"), None).unwrap();
        let (_, fk) = &note_parents[0];
        assert!(!fk.primary);
        assert!(!fk.multi);

        // primary filtering
        assert_eq!(graph.parents(&full("trial"), Some(true)).unwrap().len(), 1);
        assert_eq!(graph.parents(&full("trial"), Some(false)).unwrap().len(), 0);

        let children = graph.children(&full("session"), None).unwrap();
        let mut names: Vec<&String> = children.iter().map(|(name, _)| name).collect();
        names.sort();
        assert_eq!(names, vec![&full("note"), &full("trial")]);
        assert_eq!(graph.children(&full("session"), Some(true)).unwrap().len(), 1);
    }

    #[test]
    fn test_aliased_paths_get_distinct_alias_nodes() {
        let mut conn = connect(
            "CREATE TABLE person (id INTEGER PRIMARY KEY);
             CREATE TABLE document (
                 doc_id INTEGER PRIMARY KEY,
                 owner_id INTEGER,
                 editor_id INTEGER,
                 FOREIGN KEY (owner_id) REFERENCES person(id),
                 FOREIGN KEY (editor_id) REFERENCES person(id))",
        );
        conn.load_dependencies().unwrap();
        let graph = conn.dependencies();

        assert_eq!(graph.alias_node_count(), 2);
        // Each aliased relationship contributes two edges
        assert_eq!(graph.edge_count(), 4);

        let parents = graph.parents(&full("document"), None).unwrap();
        assert_eq!(parents.len(), 2);
        for (name, fk) in &parents {
            assert_eq!(name, &full("person"));
            assert!(fk.aliased);
        }

        // Alias nodes never surface in ordering queries
        let descendants = graph.descendants(&full("person")).unwrap();
        assert_eq!(descendants, vec![full("person"), full("document")]);
    }

    #[test]
    fn test_composite_foreign_key_preserves_column_order() {
        let mut conn = connect(
            "CREATE TABLE scan (
                 subject INTEGER,
                 session INTEGER,
                 PRIMARY KEY (subject, session));
             CREATE TABLE roi (
                 subject INTEGER,
                 session INTEGER,
                 roi INTEGER,
                 PRIMARY KEY (subject, session, roi),
                 FOREIGN KEY (subject, session) REFERENCES scan(subject, session))",
        );
        conn.load_dependencies().unwrap();
        let graph = conn.dependencies();

        assert_eq!(
            graph.primary_key(&full("scan")),
            Some(&BTreeSet::from(["subject".to_string(), "session".to_string()]))
        );
        let parents = graph.parents(&full("roi"), None).unwrap();
        assert_eq!(parents.len(), 1);
        let (_, fk) = &parents[0];
        assert_eq!(
            fk.attr_map,
            vec![
                ("subject".to_string(), "subject".to_string()),
                ("session".to_string(), "session".to_string()),
            ]
        );
        assert!(fk.primary);
        assert!(fk.multi);
    }

    #[test]
    fn test_implicit_reference_resolves_to_parent_key() {
        let mut conn = connect(
            "CREATE TABLE parent (id INTEGER PRIMARY KEY);
             CREATE TABLE child (
                 child_id INTEGER PRIMARY KEY,
                 parent_id INTEGER REFERENCES parent)",
        );
        conn.load_dependencies().unwrap();
        let graph = conn.dependencies();

        let parents = graph.parents(&full("child"), None).unwrap();
        assert_eq!(parents.len(), 1);
        let (name, fk) = &parents[0];
        assert_eq!(name, &full("parent"));
        assert_eq!(
            fk.attr_map,
            vec![("parent_id".to_string(), "id".to_string())]
        );
        assert!(fk.aliased);
    }

    #[test]
    fn test_reload_is_isomorphic() {
        let mut conn = connect(
            "CREATE TABLE person (id INTEGER PRIMARY KEY);
             CREATE TABLE document (
                 doc_id INTEGER PRIMARY KEY,
                 owner_id INTEGER,
                 FOREIGN KEY (owner_id) REFERENCES person(id))",
        );
        conn.load_dependencies().unwrap();
        let (tables, aliases, edges) = {
            let graph = conn.dependencies();
            (
                graph.table_count(),
                graph.alias_node_count(),
                graph.edge_count(),
            )
        };

        conn.load_dependencies().unwrap();
        let graph = conn.dependencies();
        assert_eq!(graph.table_count(), tables);
        assert_eq!(graph.alias_node_count(), aliases);
        assert_eq!(graph.edge_count(), edges);
    }

    #[test]
    fn test_cycle_is_fatal_and_leaves_nothing_queryable() {
        // SQLite resolves foreign-key targets lazily, so a two-table cycle
        // can be declared
        let mut conn = connect(
            "CREATE TABLE a (id INTEGER PRIMARY KEY, b_id INTEGER REFERENCES b(id));
             CREATE TABLE b (id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES a(id))",
        );
        let result = conn.load_dependencies();
        assert!(matches!(result, Err(DataLinkError::Schema(_))));

        let graph = conn.dependencies();
        assert!(!graph.is_loaded());
        assert_eq!(graph.table_count(), 0);
        assert!(graph.descendants(&full("a")).is_err());
    }

    #[test]
    fn test_hidden_tables_are_excluded() {
        let mut conn = connect(
            "CREATE TABLE visible (id INTEGER PRIMARY KEY);
             CREATE TABLE \"~hidden\" (id INTEGER PRIMARY KEY)",
        );
        conn.load_dependencies().unwrap();
        let graph = conn.dependencies();
        assert_eq!(graph.table_count(), 1);
        assert!(graph.primary_key(&full("~hidden")).is_none());
    }

    #[test]
    fn test_unknown_table_is_an_error() {
        let mut conn = connect("CREATE TABLE a (id INTEGER PRIMARY KEY)");
        conn.load_dependencies().unwrap();
        let graph = conn.dependencies();
        assert!(graph.descendants("`main`.`nope`").is_err());
        assert!(graph.ancestors("`main`.`nope`").is_err());
        assert!(graph.parents("`main`.`nope`", None).is_err());
    }

    #[test]
    fn test_load_requires_registered_schema() {
        let mut conn = Connection::new(
            ":memory:",
            "tester",
            "",
            Some(Port::Embedded),
            None,
            TlsPolicy::default(),
        )
        .unwrap();
        assert!(matches!(
            conn.load_dependencies(),
            Err(DataLinkError::Schema(_))
        ));
    }
}

#[cfg(test)]
mod order_properties {
    use super::*;
    use proptest::prelude::*;

    /// Builds a graph over `n` tables where an edge i→j exists iff
    /// `edge_bits` selects the pair and i < j (guaranteeing acyclicity).
    fn build(n: usize, edge_bits: u64) -> (Dependencies, Vec<String>) {
        let names: Vec<String> = (0..n).map(|i| format!("`s`.`t{}`", i)).collect();
        let mut graph = Dependencies::new();
        for name in &names {
            graph.insert_table(name, BTreeSet::from(["id".to_string()]));
        }
        let mut bit = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                if edge_bits & (1 << bit) != 0 {
                    // Same-name mapping keeps the relationship alias-free
                    graph.insert_foreign_key(
                        &names[j],
                        &names[i],
                        vec![("id".to_string(), "id".to_string())],
                    );
                }
                bit += 1;
            }
        }
        (graph, names)
    }

    fn position(list: &[String], name: &str) -> Option<usize> {
        list.iter().position(|entry| entry == name)
    }

    proptest! {
        #[test]
        fn descendants_start_with_subject_and_respect_edges(
            n in 2usize..7,
            edge_bits in any::<u64>(),
        ) {
            let (graph, names) = build(n, edge_bits);
            for name in &names {
                let descendants = graph.descendants(name).unwrap();
                prop_assert_eq!(&descendants[0], name);
                // every edge within the result is honored by the ordering
                for (from, to, _) in &graph.edges {
                    if let (Node::Table(from), Node::Table(to)) = (from, to) {
                        if let (Some(a), Some(b)) =
                            (position(&descendants, from), position(&descendants, to))
                        {
                            prop_assert!(a < b, "{} must precede {}", from, to);
                        }
                    }
                }
            }
        }

        #[test]
        fn ancestors_reversed_is_topological(
            n in 2usize..7,
            edge_bits in any::<u64>(),
        ) {
            let (graph, names) = build(n, edge_bits);
            for name in &names {
                let ancestors = graph.ancestors(name).unwrap();
                prop_assert_eq!(&ancestors[0], name);
                let mut reversed = ancestors.clone();
                reversed.reverse();
                for (from, to, _) in &graph.edges {
                    if let (Node::Table(from), Node::Table(to)) = (from, to) {
                        if let (Some(a), Some(b)) =
                            (position(&reversed, from), position(&reversed, to))
                        {
                            prop_assert!(a < b, "{} must precede {}", from, to);
                        }
                    }
                }
            }
        }
    }
}
