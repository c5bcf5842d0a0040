use proptest::prelude::*;
use skyfleet_planner::{path_hops, Cell, Grid, GridSize, PathPlanner, PlannerConfig, RiskMap};
use skyfleet_structs::{agent::Agent, Point};

const SIZE: i32 = 8;

fn cell() -> impl Strategy<Value = Cell> {
    (0..SIZE, 0..SIZE, 0..3).prop_map(|(x, y, z)| Cell::new(x, y, z))
}

fn planner() -> PathPlanner {
    let grid = Grid::new(GridSize::new(SIZE, SIZE, 3), 10.0).unwrap();
    PathPlanner::with_grid(grid, PlannerConfig::default())
}

proptest! {
    #[test]
    fn empty_grid_paths_use_fewest_moves(a in cell(), b in cell()) {
        let p = planner();
        let risk = RiskMap::new(p.grid().size());
        let agent = Agent::new("a", p.grid().center_of(&a));
        let path = p.plan(&agent, p.grid().center_of(&a), p.grid().center_of(&b), &risk);
        prop_assert_eq!(path_hops(&path) as u32, a.hops_to(&b));
        prop_assert!(path.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn occupied_goal_is_unreachable(a in cell(), b in cell()) {
        prop_assume!(a != b);
        let mut p = planner();
        p.grid_mut().set_occupied(b, true);
        let risk = RiskMap::new(p.grid().size());
        let agent = Agent::new("a", p.grid().center_of(&a));
        let path = p.plan(&agent, p.grid().center_of(&a), p.grid().center_of(&b), &risk);
        prop_assert!(path.is_empty());
    }

    #[test]
    fn paths_stay_on_free_cells(a in cell(), b in cell(), walls in prop::collection::vec(cell(), 0..40)) {
        let mut p = planner();
        for w in walls.iter().filter(|w| **w != a && **w != b) {
            p.grid_mut().set_occupied(*w, true);
        }
        let risk = RiskMap::new(p.grid().size());
        let agent = Agent::new("a", Point::ZERO);
        let path = p.plan(&agent, p.grid().center_of(&a), p.grid().center_of(&b), &risk);
        for node in &path {
            prop_assert!(p.grid().is_free(&p.grid().cell_of(&node.point())));
        }
        for w in path.windows(2) {
            let (c0, c1) = (p.grid().cell_of(&w[0].point()), p.grid().cell_of(&w[1].point()));
            prop_assert_eq!(c0.hops_to(&c1), 1);
        }
    }
}
