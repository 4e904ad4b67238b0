use crate::graph::GraphModel;
use layermap_core::{EdgeId, LayoutDirection, NodeId, NodeKind, Position, Size};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

pub trait Layouter {
    fn execute(&self, model: &GraphModel) -> LayoutResult;
}

/// Key used to order a node against the nodes of its neighbouring rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderingHeuristic {
    #[default]
    Median,
    Barycenter,
}

impl OrderingHeuristic {
    /// `positions` must be non-empty.
    fn key(&self, positions: &mut [f64]) -> f64 {
        match self {
            OrderingHeuristic::Median => {
                positions.sort_by(|a, b| a.total_cmp(b));
                let mid = positions.len() / 2;
                if positions.len() % 2 == 1 {
                    positions[mid]
                } else {
                    (positions[mid - 1] + positions[mid]) / 2.0
                }
            }
            OrderingHeuristic::Barycenter => {
                positions.iter().sum::<f64>() / positions.len() as f64
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub direction: LayoutDirection,
    /// Distance between two consecutive ranks on the rank axis.
    pub rank_separation: f64,
    /// Gap between two neighbouring nodes of the same rank.
    pub node_separation: f64,
    pub node_size: Size,
    /// Footprint overrides for specific node kinds.
    pub kind_sizes: BTreeMap<NodeKind, Size>,
    /// Hard cap on crossing-minimisation sweeps.
    pub max_sweeps: usize,
    pub heuristic: OrderingHeuristic,
}

impl LayoutConfig {
    pub const DEFAULT_RANK_SEPARATION: f64 = 150.0;
    pub const DEFAULT_NODE_SEPARATION: f64 = 50.0;
    pub const DEFAULT_NODE_WIDTH: f64 = 200.0;
    pub const DEFAULT_NODE_HEIGHT: f64 = 80.0;
    pub const DEFAULT_MAX_SWEEPS: usize = 8;

    pub fn with_direction(direction: LayoutDirection) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }

    pub fn size_of(&self, kind: &NodeKind) -> Size {
        self.kind_sizes.get(kind).copied().unwrap_or(self.node_size)
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::TopToBottom,
            rank_separation: Self::DEFAULT_RANK_SEPARATION,
            node_separation: Self::DEFAULT_NODE_SEPARATION,
            node_size: Size::new(Self::DEFAULT_NODE_WIDTH, Self::DEFAULT_NODE_HEIGHT),
            kind_sizes: BTreeMap::new(),
            max_sweeps: Self::DEFAULT_MAX_SWEEPS,
            heuristic: OrderingHeuristic::Median,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutBounds {
    pub width: f64,
    pub height: f64,
}

/// Output of one layout run. Positions are listed in the model's node order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    direction: LayoutDirection,
    positions: Vec<(NodeId, Position)>,
    ranks: Vec<usize>,
    lookup: HashMap<NodeId, usize>,
    layers: Vec<Vec<NodeId>>,
    back_edges: Vec<EdgeId>,
    self_loops: Vec<EdgeId>,
    crossings: usize,
    sweeps: usize,
    converged: bool,
    bounds: LayoutBounds,
}

impl LayoutResult {
    pub fn empty(direction: LayoutDirection) -> Self {
        Self {
            direction,
            converged: true,
            ..Self::default()
        }
    }

    pub fn direction(&self) -> LayoutDirection {
        self.direction
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = (&NodeId, &Position)> {
        self.positions.iter().map(|(id, position)| (id, position))
    }

    pub fn position(&self, id: &NodeId) -> Option<Position> {
        self.lookup.get(id).map(|&i| self.positions[i].1)
    }

    pub fn rank(&self, id: &NodeId) -> Option<usize> {
        self.lookup.get(id).map(|&i| self.ranks[i])
    }

    /// Node ids per rank, in their final within-rank order.
    pub fn layers(&self) -> &[Vec<NodeId>] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Edges reversed during cycle breaking.
    pub fn back_edges(&self) -> &[EdgeId] {
        &self.back_edges
    }

    pub fn is_back_edge(&self, id: &EdgeId) -> bool {
        self.back_edges.contains(id)
    }

    pub fn self_loops(&self) -> &[EdgeId] {
        &self.self_loops
    }

    /// Crossings between edges joining adjacent ranks in the final ordering.
    pub fn crossings(&self) -> usize {
        self.crossings
    }

    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    /// False when ordering stopped because the sweep budget ran out.
    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn bounds(&self) -> LayoutBounds {
        self.bounds
    }

    pub fn into_position_map(self) -> HashMap<NodeId, Position> {
        self.positions.into_iter().collect()
    }
}

/// Dense view of the model used by the layout passes. Node `i` is the model's `i`-th node.
struct LayerGraph {
    len: usize,
    /// Outgoing (link slot, target) pairs in edge insertion order, self-loops excluded.
    outgoing: Vec<Vec<(usize, usize)>>,
    /// Every non-self-loop edge as (edge position, source, target).
    links: Vec<(usize, usize, usize)>,
    self_loops: Vec<usize>,
}

impl LayerGraph {
    fn from_model(model: &GraphModel) -> Self {
        let len = model.node_count();
        let mut outgoing = vec![Vec::new(); len];
        let mut links = Vec::with_capacity(model.edge_count());
        let mut self_loops = Vec::new();

        for (position, edge) in model.edges().iter().enumerate() {
            let (Some(source), Some(target)) =
                (model.node_index(&edge.source), model.node_index(&edge.target))
            else {
                tracing::warn!("Skipping edge {} with unresolved endpoints", edge.id);
                continue;
            };
            if source == target {
                self_loops.push(position);
                continue;
            }
            outgoing[source.0].push((links.len(), target.0));
            links.push((position, source.0, target.0));
        }

        Self {
            len,
            outgoing,
            links,
            self_loops,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    Active,
    Done,
}

/// Acyclic view of the graph produced by pass 1.
struct Acyclic {
    back_edges: Vec<usize>,
    predecessors: Vec<Vec<usize>>,
    successors: Vec<Vec<usize>>,
    /// (source, target) after reversal, parallel edges kept.
    edges: Vec<(usize, usize)>,
}

/// Lays nodes out in ranks following edge direction.
///
/// Four passes: DFS cycle breaking, longest-path ranking, bounded median/barycenter sweeps
/// for crossing reduction, and coordinate assignment along the configured direction.
#[derive(Debug, Clone, Default)]
pub struct LayeredLayouter {
    pub config: LayoutConfig,
}

impl LayeredLayouter {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn with_direction(direction: LayoutDirection) -> Self {
        Self::new(LayoutConfig::with_direction(direction))
    }

    fn dfs_roots(graph: &LayerGraph) -> Vec<usize> {
        let mut in_degree = vec![0usize; graph.len];
        for &(_, _, target) in &graph.links {
            in_degree[target] += 1;
        }
        let sources = (0..graph.len).filter(|&n| in_degree[n] == 0);
        let rest = (0..graph.len).filter(|&n| in_degree[n] != 0);
        sources.chain(rest).collect()
    }

    fn break_cycles(graph: &LayerGraph) -> Acyclic {
        let mut state = vec![Visit::Unvisited; graph.len];
        let mut is_back = vec![false; graph.links.len()];

        for root in Self::dfs_roots(graph) {
            if state[root] != Visit::Unvisited {
                continue;
            }
            state[root] = Visit::Active;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

            while let Some(&(node, cursor)) = stack.last() {
                let Some(&(slot, target)) = graph.outgoing[node].get(cursor) else {
                    state[node] = Visit::Done;
                    stack.pop();
                    continue;
                };
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                match state[target] {
                    Visit::Unvisited => {
                        state[target] = Visit::Active;
                        stack.push((target, 0));
                    }
                    Visit::Active => is_back[slot] = true,
                    Visit::Done => {}
                }
            }
        }

        let mut predecessors = vec![Vec::new(); graph.len];
        let mut successors = vec![Vec::new(); graph.len];
        let mut edges = Vec::with_capacity(graph.links.len());
        let mut back_edges = Vec::new();
        for (slot, &(position, source, target)) in graph.links.iter().enumerate() {
            let (from, to) = if is_back[slot] {
                back_edges.push(position);
                (target, source)
            } else {
                (source, target)
            };
            successors[from].push(to);
            predecessors[to].push(from);
            edges.push((from, to));
        }

        Acyclic {
            back_edges,
            predecessors,
            successors,
            edges,
        }
    }

    /// Longest-path layering: every node sits one rank below its deepest predecessor.
    fn assign_ranks(len: usize, acyclic: &Acyclic) -> Vec<usize> {
        let mut ranks = vec![0usize; len];
        let mut remaining: Vec<usize> = acyclic.predecessors.iter().map(Vec::len).collect();
        let mut queue: VecDeque<usize> = (0..len).filter(|&n| remaining[n] == 0).collect();
        let mut processed = 0;

        while let Some(node) = queue.pop_front() {
            processed += 1;
            for &next in &acyclic.successors[node] {
                ranks[next] = ranks[next].max(ranks[node] + 1);
                remaining[next] -= 1;
                if remaining[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if processed < len {
            tracing::warn!(
                "Ranking left {} node(s) unprocessed; cycle breaking missed an edge",
                len - processed
            );
        }
        ranks
    }

    fn build_layers(ranks: &[usize]) -> Vec<Vec<usize>> {
        let layer_count = ranks.iter().copied().max().map_or(0, |max| max + 1);
        let mut layers = vec![Vec::new(); layer_count];
        for (node, &rank) in ranks.iter().enumerate() {
            layers[rank].push(node);
        }
        layers
    }

    fn order_positions(len: usize, layers: &[Vec<usize>]) -> Vec<usize> {
        let mut order = vec![0usize; len];
        for layer in layers {
            for (i, &node) in layer.iter().enumerate() {
                order[node] = i;
            }
        }
        order
    }

    /// Reorders one rank by the heuristic key of each node's neighbours. Nodes without
    /// neighbours keep their current slot as key; ties keep the current order.
    fn reorder_layer(
        &self,
        layer: &mut Vec<usize>,
        neighbors: &[Vec<usize>],
        order: &mut [usize],
    ) -> bool {
        let mut keyed: Vec<(f64, usize, usize)> = layer
            .iter()
            .enumerate()
            .map(|(slot, &node)| {
                let mut positions: Vec<f64> =
                    neighbors[node].iter().map(|&n| order[n] as f64).collect();
                let key = if positions.is_empty() {
                    slot as f64
                } else {
                    self.config.heuristic.key(&mut positions)
                };
                (key, slot, node)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let reordered: Vec<usize> = keyed.into_iter().map(|(_, _, node)| node).collect();
        let changed = reordered != *layer;
        *layer = reordered;
        for (slot, &node) in layer.iter().enumerate() {
            order[node] = slot;
        }
        changed
    }

    /// Neighbours one rank above and one rank below each node. Edges spanning more than one
    /// rank give no ordering key, since slots of distant ranks are not comparable.
    fn adjacent_neighbors(
        ranks: &[usize],
        acyclic: &Acyclic,
    ) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
        let mut above = vec![Vec::new(); ranks.len()];
        let mut below = vec![Vec::new(); ranks.len()];
        for &(from, to) in &acyclic.edges {
            if ranks[to] == ranks[from] + 1 {
                above[to].push(from);
                below[from].push(to);
            }
        }
        (above, below)
    }

    fn count_crossings(ranks: &[usize], order: &[usize], acyclic: &Acyclic) -> usize {
        let mut by_rank: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
        for &(from, to) in &acyclic.edges {
            if ranks[to] == ranks[from] + 1 {
                by_rank
                    .entry(ranks[from])
                    .or_default()
                    .push((order[from], order[to]));
            }
        }

        let mut crossings = 0;
        for segments in by_rank.values() {
            for (i, &(a_top, a_bottom)) in segments.iter().enumerate() {
                for &(b_top, b_bottom) in &segments[i + 1..] {
                    if (a_top < b_top && a_bottom > b_bottom)
                        || (a_top > b_top && a_bottom < b_bottom)
                    {
                        crossings += 1;
                    }
                }
            }
        }
        crossings
    }

    /// Alternating down/up sweeps, capped by `max_sweeps`. Keeps the ordering with the
    /// fewest crossings seen. Returns (layers, crossings, sweeps run, converged).
    fn minimize_crossings(
        &self,
        ranks: &[usize],
        mut layers: Vec<Vec<usize>>,
        acyclic: &Acyclic,
    ) -> (Vec<Vec<usize>>, usize, usize, bool) {
        let mut order = Self::order_positions(ranks.len(), &layers);
        let mut best_crossings = Self::count_crossings(ranks, &order, acyclic);
        let mut best = layers.clone();
        let mut sweeps = 0;
        let mut converged = layers.len() < 2;

        if converged {
            return (best, best_crossings, sweeps, converged);
        }

        let (above, below) = Self::adjacent_neighbors(ranks, acyclic);

        for sweep in 0..self.config.max_sweeps {
            sweeps += 1;
            let mut changed = false;
            if sweep % 2 == 0 {
                for layer in layers.iter_mut().skip(1) {
                    changed |= self.reorder_layer(layer, &above, &mut order);
                }
            } else {
                let last = layers.len() - 1;
                for layer in layers[..last].iter_mut().rev() {
                    changed |= self.reorder_layer(layer, &below, &mut order);
                }
            }

            let crossings = Self::count_crossings(ranks, &order, acyclic);
            if crossings < best_crossings {
                best_crossings = crossings;
                best = layers.clone();
            }
            if !changed {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::debug!(
                "Crossing minimisation stopped at sweep budget {} with {} crossing(s)",
                self.config.max_sweeps,
                best_crossings
            );
        }
        (best, best_crossings, sweeps, converged)
    }

    fn order_axis_extent(&self, model: &GraphModel, layer: &[usize]) -> f64 {
        let vertical = self.config.direction.is_vertical();
        let sizes: f64 = layer
            .iter()
            .map(|&node| {
                let size = self.config.size_of(&model.nodes()[node].kind);
                if vertical { size.width } else { size.height }
            })
            .sum();
        sizes + layer.len().saturating_sub(1) as f64 * self.config.node_separation
    }

    fn assign_coordinates(&self, model: &GraphModel, layers: &[Vec<usize>]) -> Vec<Position> {
        let direction = self.config.direction;
        let vertical = direction.is_vertical();
        let max_rank = layers.len().saturating_sub(1);
        let extents: Vec<f64> = layers
            .iter()
            .map(|layer| self.order_axis_extent(model, layer))
            .collect();
        let max_extent = extents.iter().copied().fold(0.0, f64::max);

        let mut positions = vec![Position::default(); model.node_count()];
        for (rank, layer) in layers.iter().enumerate() {
            let rank_index = if direction.is_reversed() {
                max_rank - rank
            } else {
                rank
            };
            let rank_coord = rank_index as f64 * self.config.rank_separation;
            let mut offset = (max_extent - extents[rank]) / 2.0;

            for &node in layer {
                let size = self.config.size_of(&model.nodes()[node].kind);
                positions[node] = if vertical {
                    Position::new(offset, rank_coord)
                } else {
                    Position::new(rank_coord, offset)
                };
                offset += if vertical { size.width } else { size.height };
                offset += self.config.node_separation;
            }
        }
        positions
    }

    fn bounds(&self, model: &GraphModel, positions: &[Position]) -> LayoutBounds {
        let mut bounds = LayoutBounds::default();
        for (node, position) in model.nodes().iter().zip(positions) {
            let size = self.config.size_of(&node.kind);
            bounds.width = bounds.width.max(position.x + size.width);
            bounds.height = bounds.height.max(position.y + size.height);
        }
        bounds
    }
}

impl Layouter for LayeredLayouter {
    fn execute(&self, model: &GraphModel) -> LayoutResult {
        if model.is_empty() {
            return LayoutResult::empty(self.config.direction);
        }

        let graph = LayerGraph::from_model(model);
        let acyclic = Self::break_cycles(&graph);
        let ranks = Self::assign_ranks(graph.len, &acyclic);
        let layers = Self::build_layers(&ranks);
        let (layers, crossings, sweeps, converged) =
            self.minimize_crossings(&ranks, layers, &acyclic);
        let coordinates = self.assign_coordinates(model, &layers);
        let bounds = self.bounds(model, &coordinates);

        let nodes = model.nodes();
        let edges = model.edges();
        let positions: Vec<(NodeId, Position)> = nodes
            .iter()
            .zip(coordinates)
            .map(|(node, position)| (node.id.clone(), position))
            .collect();
        let lookup = positions
            .iter()
            .enumerate()
            .map(|(i, (id, _))| (id.clone(), i))
            .collect();

        tracing::debug!(
            "Layered layout: {} node(s), {} rank(s), {} back edge(s), {} crossing(s) after {} sweep(s)",
            nodes.len(),
            layers.len(),
            acyclic.back_edges.len(),
            crossings,
            sweeps
        );

        LayoutResult {
            direction: self.config.direction,
            positions,
            ranks,
            lookup,
            layers: layers
                .iter()
                .map(|layer| layer.iter().map(|&n| nodes[n].id.clone()).collect())
                .collect(),
            back_edges: acyclic
                .back_edges
                .iter()
                .map(|&e| edges[e].id.clone())
                .collect(),
            self_loops: graph
                .self_loops
                .iter()
                .map(|&e| edges[e].id.clone())
                .collect(),
            crossings,
            sweeps,
            converged,
            bounds,
        }
    }
}
