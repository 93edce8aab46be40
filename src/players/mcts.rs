use std::{
    collections::{BTreeMap, HashSet},
    sync::mpsc,
    thread,
};

use itertools::Itertools;
use log::*;
use more_asserts::{assert_gt, debug_assert_le};
use rand::{seq::SliceRandom, Rng};
use rand_mt::Mt64;

use crate::engine::{
    card::Card,
    deck::{self, FULL_DECK},
    game::{TriPeaks, DRAW_MOVE},
};

use super::{eval::Evaluator, Action, Player};

/// `pos` of the root node; never applied to a game.
const ROOT_POS: i32 = -2;

/// A hidden-card assignment made somewhere along the path from the root:
/// the tableau cell at `pos` (or the top of the stock, for a draw move,
/// with `pos` = [`DRAW_MOVE`]) was sampled to be `card`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Deter {
    pos: i32,
    card: Card,
}

/// Per-trajectory scratch shared by every node on the path: the pool of
/// hidden cards not yet assigned by a determinization.
struct NodeData {
    cards_left: Vec<Card>,
    cards_left_beginning: i32,
}

struct Node {
    x: f64,
    n: u32,
    pos: i32,
    left_det: Option<Deter>,
    right_det: Option<Deter>,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl Node {
    fn new(pos: i32, parent: Option<usize>) -> Node {
        Node {
            x: 0.0,
            n: 0,
            pos,
            left_det: None,
            right_det: None,
            parent,
            children: Vec::with_capacity(5),
        }
    }
}

/// One determinization's search tree. Nodes live in a single vec and refer
/// to each other by index, so the parent link is a plain back-reference.
struct Tree {
    nodes: Vec<Node>,
}

const ROOT: usize = 0;

impl Tree {
    fn new() -> Tree {
        Tree {
            nodes: vec![Node::new(ROOT_POS, None)],
        }
    }

    fn unvisited_child(&self, id: usize) -> Option<usize> {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child].n == 0)
    }

    /// UCB1 pick among the children of `id`. A never-visited child always
    /// wins.
    fn ucb1(&self, id: usize) -> usize {
        let node = &self.nodes[id];
        let mut highest = -1.0_f64;
        let mut selected = node.children[0];
        for &child_id in &node.children {
            let child = &self.nodes[child_id];
            let score = if child.n > 0 {
                child.x + (2.0 * f64::from(node.n).ln() / f64::from(child.n)).sqrt()
            } else {
                f64::MAX
            };
            if score > highest {
                highest = score;
                selected = child_id;
            }
        }
        selected
    }

    /// Descends from the root while the current node is fully expanded
    /// (every legal move has a child and all of them have been visited),
    /// replaying each chosen move onto `game`.
    fn select(&self, game: &mut TriPeaks) -> usize {
        let mut selected = ROOT;
        while game.cards_left > 0 {
            let (moves, _) = game.legal_moves();
            let node = &self.nodes[selected];
            if node.children.is_empty()
                || node.children.len() != moves.len()
                || self.unvisited_child(selected).is_some()
            {
                break;
            }
            selected = self.ucb1(selected);
            self.apply_node(game, selected);
        }
        selected
    }

    /// Expands `node_id` with a uniformly chosen untried legal move,
    /// sampling hidden cards the move would reveal, and applies the move
    /// to `game`.
    fn determinize(
        &mut self,
        node_id: usize,
        game: &mut TriPeaks,
        data: &mut NodeData,
        rng: &mut Mt64,
    ) -> usize {
        let (moves, _) = game.legal_moves();
        let unused = moves
            .iter()
            .copied()
            .filter(|&mv| {
                !self.nodes[node_id]
                    .children
                    .iter()
                    .any(|&child| self.nodes[child].pos == mv)
            })
            .collect_vec();

        if unused.is_empty() {
            // Every legal move already has a child, but the node still
            // counts as expandable: simulation leaves keep n == 0 until a
            // later trajectory backpropagates through them.
            let child = *self.nodes[node_id].children.choose(rng).unwrap();
            self.apply_node(game, child);
            return child;
        }

        let pos = *unused.choose(rng).unwrap();
        let child = self.nodes.len();
        self.nodes.push(Node::new(pos, Some(node_id)));
        self.nodes[node_id].children.push(child);

        if pos == DRAW_MOVE {
            let card = draw_from_pool(data, rng);
            self.nodes[child].left_det = Some(Deter {
                pos: DRAW_MOVE,
                card,
            });
        } else {
            let (left, right) = TriPeaks::check_reveals(pos);
            if let Some(parent_pos) = left {
                self.nodes[child].left_det = self
                    .parent_determinization(child, parent_pos)
                    .or_else(|| sample_reveal(game, parent_pos, data, rng));
            }
            if let Some(parent_pos) = right {
                self.nodes[child].right_det = self
                    .parent_determinization(child, parent_pos)
                    .or_else(|| sample_reveal(game, parent_pos, data, rng));
            }
        }
        self.apply_node(game, child);
        child
    }

    /// Looks for an ancestor that already assigned a card to the tableau
    /// cell `target`, so the whole path stays consistent. Draw records
    /// carry `pos` = [`DRAW_MOVE`] and can never match a cell.
    fn parent_determinization(&self, node_id: usize, target: usize) -> Option<Deter> {
        let target = target as i32;
        let mut current = self.nodes[node_id].parent;
        while let Some(id) = current {
            let node = &self.nodes[id];
            for det in [node.left_det, node.right_det].into_iter().flatten() {
                if det.pos == target {
                    return Some(det);
                }
            }
            current = node.parent;
        }
        None
    }

    /// Replays the move recorded at `id` onto `game`, first overwriting the
    /// hidden cards with the node's determinized values. Any mismatch
    /// between the tree and the game is a programming bug.
    fn apply_node(&self, game: &mut TriPeaks, id: usize) {
        let node = &self.nodes[id];
        if node.pos == DRAW_MOVE {
            let det = node.left_det.expect("draw node without a determinized card");
            assert_gt!(game.stock.len(), 0);
            let top = game.stock.len() - 1;
            game.stock.cards[top] = det.card;
            game.draw();
            if game.discard().hash_code() != det.card.hash_code() {
                panic!("determinized draw does not match the discard");
            }
        } else {
            for det in [node.left_det, node.right_det].into_iter().flatten() {
                game.cards[det.pos as usize].card = det.card;
            }
            if !game.select(node.pos) {
                panic!("game tree contained an illegal move at position {}", node.pos);
            }
        }
    }

    /// Random playout: keep expanding with fresh determinizations until
    /// the game ends, then score the terminal state.
    fn simulate(
        &mut self,
        mut node_id: usize,
        game: &mut TriPeaks,
        data: &mut NodeData,
        rng: &mut Mt64,
        eval: Evaluator,
    ) -> f64 {
        while !game.game_over() {
            debug_assert_le!(game.cards_left, data.cards_left_beginning);
            node_id = self.determinize(node_id, game, data, rng);
        }
        eval.evaluate(game)
    }

    fn backpropagate(&mut self, node_id: usize, reward: f64) {
        let mut current = Some(node_id);
        while let Some(id) = current {
            let node = &mut self.nodes[id];
            node.x += reward;
            node.n += 1;
            current = node.parent;
        }
    }
}

/// Only if the cell at `parent_pos` is about to lose its last cover does
/// this removal reveal a card worth sampling.
fn sample_reveal(
    game: &TriPeaks,
    parent_pos: usize,
    data: &mut NodeData,
    rng: &mut Mt64,
) -> Option<Deter> {
    let cell = &game.cards[parent_pos];
    if !cell.card.face_down || cell.children_left != 1 {
        return None;
    }
    let card = draw_from_pool(data, rng);
    Some(Deter {
        pos: parent_pos as i32,
        card,
    })
}

fn draw_from_pool(data: &mut NodeData, rng: &mut Mt64) -> Card {
    assert_gt!(data.cards_left.len(), 0);
    let index = rng.gen_range(0..data.cards_left.len());
    deck::remove_at(&mut data.cards_left, index)
}

/// The cards whose identity is still unknown to the player: the full deck
/// minus everything that has been seen face-up.
pub fn hidden_cards(game: &TriPeaks) -> Vec<Card> {
    let used: HashSet<i32> = game.used_cards().iter().map(Card::hash_code).collect();
    FULL_DECK
        .iter()
        .filter(|card| !used.contains(&card.hash_code()))
        .copied()
        .collect_vec()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchResult {
    pub mv: i32,
    pub score: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchResults(pub Vec<SearchResult>);

impl SearchResults {
    /// Argmax by score. Returns 0 when the list is empty or no score is
    /// positive, which collides with tableau index 0; callers that need to
    /// tell those apart must inspect the list itself.
    pub fn best_move(&self) -> i32 {
        let mut max = 0.0;
        let mut arg_max = 0;
        for result in &self.0 {
            if result.score > max {
                arg_max = result.mv;
                max = result.score;
            }
        }
        arg_max
    }
}

/// Information-set MCTS over the hidden cards of `game`.
///
/// Runs `determinizations` independent trees of `trajectories` rollouts
/// each and sums, per move, the accumulated rewards of the root's direct
/// children. The result list is ordered by move, so a fixed `rng` seed
/// reproduces it exactly.
pub fn search(
    game: &TriPeaks,
    determinizations: usize,
    trajectories: usize,
    eval: Evaluator,
    rng: &mut Mt64,
) -> SearchResults {
    let hidden = hidden_cards(game);
    debug!(
        "searching {} determinizations x {} trajectories over {} hidden cards",
        determinizations,
        trajectories,
        hidden.len()
    );
    let mut root_rewards: BTreeMap<i32, f64> = BTreeMap::new();
    for _ in 0..determinizations {
        let mut tree = Tree::new();
        for _ in 0..trajectories {
            let mut data = NodeData {
                cards_left: hidden.clone(),
                cards_left_beginning: game.cards_left,
            };
            let mut playout = game.clone();
            let mut node = tree.select(&mut playout);
            if !playout.game_over() {
                node = tree.determinize(node, &mut playout, &mut data, rng);
            }
            let reward = tree.simulate(node, &mut playout, &mut data, rng, eval);
            tree.backpropagate(node, reward);
        }
        for &child in &tree.nodes[ROOT].children {
            let node = &tree.nodes[child];
            *root_rewards.entry(node.pos).or_insert(0.0) += node.x;
        }
    }
    SearchResults(
        root_rewards
            .into_iter()
            .map(|(mv, score)| SearchResult { mv, score })
            .collect(),
    )
}

/// Picks the highest-scoring move out of merged worker results, drawing
/// when nothing scores better.
pub fn best_action(scores: &BTreeMap<i32, f64>) -> Action {
    let mut highest = -1.0;
    let mut action = Action::Draw;
    for (&mv, &score) in scores {
        if score > highest {
            highest = score;
            action = if mv == DRAW_MOVE {
                Action::Draw
            } else {
                Action::Select(mv as usize)
            };
        }
    }
    action
}

/// Runs the search on a pool of independent workers and votes by summing
/// per-move scores.
pub struct MctsPlayer {
    workers: usize,
    determinizations: usize,
    trajectories: usize,
    eval: Evaluator,
    rng: Mt64,
}

impl MctsPlayer {
    pub fn new(
        seed: u64,
        workers: usize,
        determinizations: usize,
        trajectories: usize,
        eval: Evaluator,
    ) -> Self {
        assert_gt!(workers, 0);
        MctsPlayer {
            workers,
            determinizations,
            trajectories,
            eval,
            rng: Mt64::new(seed),
        }
    }

    /// Spawns one full search per worker, each with its own RNG, and reads
    /// exactly `workers` result lists back over a channel.
    pub fn search_parallel(&mut self, game: &TriPeaks) -> BTreeMap<i32, f64> {
        let determinizations = self.determinizations;
        let trajectories = self.trajectories;
        let eval = self.eval;
        let seeds: Vec<u64> = (0..self.workers).map(|_| self.rng.next_u64()).collect();

        let (tx, rx) = mpsc::channel();
        let mut merged: BTreeMap<i32, f64> = BTreeMap::new();
        thread::scope(|scope| {
            for seed in seeds {
                let tx = tx.clone();
                scope.spawn(move || {
                    let mut rng = Mt64::new(seed);
                    let results = search(game, determinizations, trajectories, eval, &mut rng);
                    tx.send(results).unwrap();
                });
            }
            for _ in 0..self.workers {
                let results = rx.recv().expect("search worker dropped without a result");
                for result in results.0 {
                    *merged.entry(result.mv).or_insert(0.0) += result.score;
                }
            }
        });
        merged
    }
}

impl Player for MctsPlayer {
    fn name(&self) -> &str {
        "mcts"
    }

    fn get_action(&mut self, game: &TriPeaks) -> Action {
        let scores = self.search_parallel(game);
        debug!("merged worker scores: {:?}", scores);
        best_action(&scores)
    }
}

#[cfg(test)]
mod tests {
    use more_asserts::{assert_ge, assert_le};

    use super::*;
    use crate::engine::deck::Deck;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn shuffled_game(seed: u64) -> TriPeaks {
        let mut rng = Mt64::new(seed);
        let mut deck = Deck::new();
        deck.shuffle(&mut rng);
        TriPeaks::new(deck)
    }

    #[test]
    fn test_hidden_cards_complement_used() {
        let game = TriPeaks::new(Deck::new());
        let hidden = hidden_cards(&game);
        // 52 minus 10 face-up base cards and 1 discard.
        assert_eq!(41, hidden.len());

        let used: HashSet<i32> = game.used_cards().iter().map(Card::hash_code).collect();
        assert!(hidden.iter().all(|c| !used.contains(&c.hash_code())));
    }

    #[test]
    fn test_unvisited_child_has_priority() {
        let mut tree = Tree::new();
        tree.nodes[ROOT].n = 10;
        for (pos, visits) in [(18, 4_u32), (19, 0), (20, 6)] {
            let id = tree.nodes.len();
            let mut node = Node::new(pos, Some(ROOT));
            node.n = visits;
            node.x = visits as f64 * 100.0;
            tree.nodes.push(node);
            tree.nodes[ROOT].children.push(id);
        }
        // Child 19 has never been visited; it beats any finite score.
        assert_eq!(19, tree.nodes[tree.ucb1(ROOT)].pos);
        assert_eq!(19, tree.nodes[tree.unvisited_child(ROOT).unwrap()].pos);
    }

    #[test]
    fn test_ucb1_balances_reward_and_visits() {
        let mut tree = Tree::new();
        tree.nodes[ROOT].n = 100;
        for (pos, visits, x) in [(18, 50_u32, 10.0), (19, 2, 9.0)] {
            let id = tree.nodes.len();
            let mut node = Node::new(pos, Some(ROOT));
            node.n = visits;
            node.x = x;
            tree.nodes.push(node);
            tree.nodes[ROOT].children.push(id);
        }
        // The barely-explored child wins on its exploration bonus.
        assert_eq!(19, tree.nodes[tree.ucb1(ROOT)].pos);
    }

    #[test]
    fn test_backpropagate_updates_the_whole_path() {
        let mut tree = Tree::new();
        tree.nodes.push(Node::new(18, Some(ROOT)));
        tree.nodes[ROOT].children.push(1);
        tree.nodes.push(Node::new(19, Some(1)));
        tree.nodes[1].children.push(2);

        tree.backpropagate(2, 0.5);
        tree.backpropagate(2, 0.25);
        tree.backpropagate(1, 1.0);

        assert_eq!(3, tree.nodes[ROOT].n);
        assert_eq!(1.75, tree.nodes[ROOT].x);
        assert_eq!(3, tree.nodes[1].n);
        assert_eq!(1.75, tree.nodes[1].x);
        assert_eq!(2, tree.nodes[2].n);
        assert_eq!(0.75, tree.nodes[2].x);
    }

    #[test]
    fn test_visit_counts_are_consistent() {
        let game = shuffled_game(0x99);
        let hidden = hidden_cards(&game);
        let mut rng = Mt64::new(17);
        let mut tree = Tree::new();
        for _ in 0..40 {
            let mut data = NodeData {
                cards_left: hidden.clone(),
                cards_left_beginning: game.cards_left,
            };
            let mut playout = game.clone();
            let mut node = tree.select(&mut playout);
            if !playout.game_over() {
                node = tree.determinize(node, &mut playout, &mut data, &mut rng);
            }
            let reward = tree.simulate(node, &mut playout, &mut data, &mut rng, Evaluator::Binary);
            tree.backpropagate(node, reward);
        }
        // Every trajectory passes through the root and exactly one child.
        assert_eq!(40, tree.nodes[ROOT].n);
        let child_visits: u32 = tree.nodes[ROOT]
            .children
            .iter()
            .map(|&child| tree.nodes[child].n)
            .sum();
        assert_eq!(40, child_visits);
    }

    #[test]
    fn test_search_covers_exactly_the_legal_moves() {
        init();
        let game = shuffled_game(0x7ea);
        let (legal, _) = game.legal_moves();
        let results = search(&game, 2, 60, Evaluator::ScoreSigmoid, &mut Mt64::new(1));

        // Sixty trajectories are more than enough to expand every root move.
        assert_eq!(legal.len(), results.0.len());
        for result in &results.0 {
            assert!(legal.contains(&result.mv), "illegal move {}", result.mv);
        }
    }

    #[test]
    fn test_search_on_draw_only_state() {
        // The unshuffled deal leaves drawing as the only legal move.
        let game = TriPeaks::new(Deck::new());
        let results = search(&game, 1, 20, Evaluator::Binary, &mut Mt64::new(3));
        assert_eq!(1, results.0.len());
        assert_eq!(DRAW_MOVE, results.0[0].mv);
    }

    #[test]
    fn test_search_leaves_the_input_untouched() {
        let game = shuffled_game(0xbeef);
        let before = game.used_cards();
        search(&game, 1, 50, Evaluator::Binary, &mut Mt64::new(5));
        assert_eq!(before, game.used_cards());
        assert_eq!(28, game.cards_left);
    }

    #[test]
    fn test_search_is_deterministic_under_a_fixed_seed() {
        init();
        let game = shuffled_game(0xdead);
        let first = search(&game, 1, 100, Evaluator::Binary, &mut Mt64::new(99));
        let second = search(&game, 1, 100, Evaluator::Binary, &mut Mt64::new(99));
        assert_eq!(first, second);
    }

    #[test]
    fn test_binary_scores_bounded_by_rollout_count() {
        let game = shuffled_game(0xf00d);
        let (determinizations, trajectories) = (3, 40);
        let results = search(
            &game,
            determinizations,
            trajectories,
            Evaluator::Binary,
            &mut Mt64::new(11),
        );
        for result in &results.0 {
            assert_ge!(result.score, 0.0);
            assert_le!(result.score, (determinizations * trajectories) as f64);
        }
    }

    #[test]
    fn test_best_move_quirks() {
        assert_eq!(0, SearchResults::default().best_move());

        let all_zero = SearchResults(vec![
            SearchResult { mv: 5, score: 0.0 },
            SearchResult { mv: DRAW_MOVE, score: 0.0 },
        ]);
        assert_eq!(0, all_zero.best_move());

        let results = SearchResults(vec![
            SearchResult { mv: 5, score: 1.5 },
            SearchResult { mv: 9, score: 3.0 },
            SearchResult { mv: DRAW_MOVE, score: 2.0 },
        ]);
        assert_eq!(9, results.best_move());
    }

    #[test]
    fn test_best_action_falls_back_to_draw() {
        assert_eq!(Action::Draw, best_action(&BTreeMap::new()));

        let mut scores = BTreeMap::new();
        scores.insert(20, 4.0);
        scores.insert(DRAW_MOVE, 1.0);
        assert_eq!(Action::Select(20), best_action(&scores));
    }

    #[test]
    fn test_parallel_workers_merge_deterministically() {
        init();
        let game = shuffled_game(0xabc);
        let mut first = MctsPlayer::new(42, 2, 2, 30, Evaluator::ScoreSigmoid);
        let mut second = MctsPlayer::new(42, 2, 2, 30, Evaluator::ScoreSigmoid);
        assert_eq!(first.search_parallel(&game), second.search_parallel(&game));
    }

    #[test]
    fn test_player_finishes_a_game() {
        init();
        let mut game = shuffled_game(0x515);
        let mut player = MctsPlayer::new(8, 2, 2, 25, Evaluator::ScoreSigmoid);
        while !game.game_over() {
            match player.get_action(&game) {
                Action::Draw => assert!(game.draw()),
                Action::Select(pos) => assert!(game.select(pos as i32)),
            }
        }
        assert_ge!(game.cards_left, 0);
    }
}
