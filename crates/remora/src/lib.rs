//! Deterministic dependency-ordering algorithms.
//!
//! Built on [`remora_graph::DirectedGraph`]: `cycles` turns an arbitrary
//! dependency graph into an acyclic one without failing, `sort` produces a
//! total order that respects every edge and keeps unconstrained nodes in
//! their original relative order.
//!
//! The intended pipeline is: build a graph from domain edges, run
//! [`cycles::break_cycles`] if the edges may be circular, then run
//! [`sort::topological_sort`] (or the projection variant) for the final
//! order.

pub use remora_graph as graph;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cycles {
    use crate::graph::DirectedGraph;
    use rustc_hash::FxBuildHasher;
    use std::collections::VecDeque;
    use std::fmt;
    use std::hash::Hash;

    type HashSet<T> = hashbrown::HashSet<T, FxBuildHasher>;

    /// Finds one cycle, if any exists, as a closed walk of distinct nodes.
    ///
    /// Iterative depth-first search over every node in graph insertion order.
    /// Each frame keeps the node's not-yet-visited successors in a queue
    /// seeded in edge insertion order, so which cycle gets reported first is
    /// reproducible across runs. A self-loop counts as a cycle of one node;
    /// [`break_cycles`] strips self-loops before searching.
    pub fn find_cycle<N, E>(g: &DirectedGraph<N, E>) -> Option<Vec<N>>
    where
        N: Eq + Hash + Clone + fmt::Debug,
        E: Clone,
    {
        let mut processed: HashSet<N> = HashSet::default();

        for root in g.nodes() {
            if processed.contains(root) {
                continue;
            }

            let mut on_stack: HashSet<N> = HashSet::default();
            on_stack.insert(root.clone());
            let mut stack: Vec<(N, VecDeque<N>)> =
                vec![(root.clone(), pending_successors(g, root))];

            while let Some((top, remaining)) = stack.last_mut() {
                let Some(next) = remaining.pop_front() else {
                    processed.insert(top.clone());
                    on_stack.remove(top);
                    stack.pop();
                    continue;
                };

                if on_stack.contains(&next) {
                    // The cycle is the stack suffix from `next`'s frame to the
                    // top, in stack order.
                    let start = stack
                        .iter()
                        .position(|(node, _)| *node == next)
                        .expect("on-stack node has a frame");
                    return Some(stack[start..].iter().map(|(node, _)| node.clone()).collect());
                }
                if !processed.contains(&next) {
                    on_stack.insert(next.clone());
                    let successors = pending_successors(g, &next);
                    stack.push((next, successors));
                }
            }
        }

        None
    }

    /// Rewrites `g` in place until it has no cycles.
    ///
    /// Self-loops are dropped first; they carry no ordering information. Then,
    /// repeatedly: find one cycle, delete every edge between its members
    /// (edges in or out of the cycle are untouched), and re-link the members
    /// as a single chain in ascending `key` order, each member depending on
    /// its immediate lower-ranked neighbor. The chain pins the members to
    /// exactly their `key` order in any later sort while leaving them free to
    /// move as a block. Synthetic chain edges carry `E::default()`.
    ///
    /// Each iteration strictly reduces the edges among the affected members
    /// to a chain and never introduces a new cycle, so the loop terminates.
    /// Running it again on the result is a no-op.
    pub fn break_cycles<N, E, R>(g: &mut DirectedGraph<N, E>, key: impl Fn(&N) -> R)
    where
        N: Eq + Hash + Clone + fmt::Debug,
        E: Clone + Default,
        R: Ord,
    {
        remove_self_references(g);

        while let Some(cycle) = find_cycle(g) {
            for origin in &cycle {
                for destination in &cycle {
                    let _ = g.remove_edge(origin, destination);
                }
            }

            let mut chain = cycle;
            chain.sort_by_key(|node| key(node));
            for pair in chain.windows(2) {
                let _ = g.add_edge(&pair[1], &pair[0], E::default());
            }

            tracing::debug!(
                members = chain.len(),
                first = ?chain.first(),
                last = ?chain.last(),
                "replaced dependency cycle with a rank-ordered chain"
            );
        }
    }

    fn remove_self_references<N, E>(g: &mut DirectedGraph<N, E>)
    where
        N: Eq + Hash + Clone + fmt::Debug,
        E: Clone,
    {
        let nodes: Vec<N> = g.nodes().cloned().collect();
        for node in &nodes {
            let _ = g.remove_edge(node, node);
        }
    }

    fn pending_successors<N, E>(g: &DirectedGraph<N, E>, node: &N) -> VecDeque<N>
    where
        N: Eq + Hash + Clone + fmt::Debug,
        E: Clone,
    {
        g.successors(node)
            .expect("node came from this graph")
            .cloned()
            .collect()
    }
}

pub mod sort {
    use crate::graph::DirectedGraph;
    use rustc_hash::FxBuildHasher;
    use std::fmt;
    use std::hash::Hash;

    type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;
    type HashSet<T> = hashbrown::HashSet<T, FxBuildHasher>;

    /// Orders all nodes of `g` so that every dependency precedes its
    /// dependents, keeping unconstrained nodes in graph insertion order.
    ///
    /// # Panics
    ///
    /// Panics if `g` contains a cycle. Run [`crate::cycles::break_cycles`]
    /// first when the input may be circular.
    pub fn topological_sort<N, E>(g: &DirectedGraph<N, E>) -> Vec<N>
    where
        N: Eq + Hash + Clone + fmt::Debug,
        E: Clone,
    {
        let reference: Vec<N> = g.nodes().cloned().collect();
        sort_nodes(&reference, g)
    }

    /// Orders only the listed nodes, using the list as the tie-breaking
    /// reference order.
    ///
    /// `g` may contain additional nodes; their edges still constrain the
    /// listed nodes, but they do not appear in the output. Every listed node
    /// must be a node of `g`. Graph nodes absent from `nodes` are ranked
    /// after every listed node, in graph insertion order; the placement is
    /// deterministic but only observable when such a node ties with a listed
    /// one.
    ///
    /// # Panics
    ///
    /// Panics if `g` contains a cycle.
    pub fn topological_sort_subset<N, E>(nodes: &[N], g: &DirectedGraph<N, E>) -> Vec<N>
    where
        N: Eq + Hash + Clone + fmt::Debug,
        E: Clone,
    {
        sort_nodes(nodes, g)
    }

    /// Checks that every node's dependencies appear before it in `nodes`.
    ///
    /// `nodes` is expected to contain every dependency of its members; a
    /// dependency outside the slice counts as unsorted. Nodes absent from the
    /// graph are skipped.
    pub fn is_topologically_sorted<N, E>(nodes: &[N], g: &DirectedGraph<N, E>) -> bool
    where
        N: Eq + Hash + Clone + fmt::Debug,
        E: Clone,
    {
        let mut visited: HashSet<&N> = HashSet::default();
        for node in nodes {
            visited.insert(node);
            let Ok(dependencies) = g.successors(node) else {
                continue;
            };
            for dependency in dependencies {
                if !visited.contains(dependency) {
                    return false;
                }
            }
        }
        true
    }

    fn sort_nodes<N, E>(reference: &[N], g: &DirectedGraph<N, E>) -> Vec<N>
    where
        N: Eq + Hash + Clone + fmt::Debug,
        E: Clone,
    {
        // Mutable copy: finalized nodes are popped off it edge by edge, the
        // caller's graph stays untouched.
        let mut remaining = g.clone();

        let ranks = reference_ranks(reference, g);
        let rank_of = |node: &N| ranks.get(node).copied().unwrap_or(usize::MAX);

        let mut pending: Vec<N> = g
            .nodes()
            .filter(|node| has_no_predecessors(g, node))
            .cloned()
            .collect();

        let mut result: Vec<N> = Vec::with_capacity(g.node_count());
        loop {
            // Finalize the highest-ranked ready node first; after the final
            // reversal that turns into "ascending reference order for ties".
            pending.sort_by_key(|node| rank_of(node));
            let Some(node) = pending.pop() else { break };

            let dependencies: Vec<N> = remaining
                .successors(&node)
                .expect("pending nodes stay in the working graph")
                .cloned()
                .collect();
            remaining
                .remove_node(&node)
                .expect("pending nodes stay in the working graph");

            for dependency in dependencies {
                if !remaining.has_node(&dependency) {
                    continue;
                }
                if has_no_predecessors(&remaining, &dependency) && !pending.contains(&dependency) {
                    pending.push(dependency);
                }
            }

            result.push(node);
        }

        assert!(
            remaining.is_empty(),
            "dependency graph still contains a cycle; run break_cycles before sorting"
        );

        result.reverse();
        debug_assert!(is_topologically_sorted(&result, g));

        let requested: HashSet<&N> = reference.iter().collect();
        result.retain(|node| requested.contains(node));
        result
    }

    // Rank = position in the reference sequence. Graph nodes missing from the
    // sequence rank after every referenced node, in graph insertion order.
    fn reference_ranks<N, E>(reference: &[N], g: &DirectedGraph<N, E>) -> HashMap<N, usize>
    where
        N: Eq + Hash + Clone + fmt::Debug,
        E: Clone,
    {
        let mut ranks: HashMap<N, usize> = HashMap::default();
        for node in reference {
            let next = ranks.len();
            ranks.entry(node.clone()).or_insert(next);
        }
        for node in g.nodes() {
            if !ranks.contains_key(node) {
                let next = ranks.len();
                ranks.insert(node.clone(), next);
            }
        }
        ranks
    }

    fn has_no_predecessors<N, E>(g: &DirectedGraph<N, E>, node: &N) -> bool
    where
        N: Eq + Hash + Clone + fmt::Debug,
        E: Clone,
    {
        g.predecessors(node)
            .is_ok_and(|mut predecessors| predecessors.next().is_none())
    }
}
