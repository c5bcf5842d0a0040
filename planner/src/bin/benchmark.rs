#[cfg(not(feature = "prof"))]
pub fn main() {
    println!("benchmarks not supported -- enable 'prof' crate feature")
}

#[cfg(feature = "prof")]
struct InstanceSpec {
    size: i32,
    density: f32,
    seed: u64,
}

#[cfg(feature = "prof")]
#[derive(Debug)]
struct Result {
    time: f32,
    hops: usize,
    cost: f32,
}

#[cfg(feature = "prof")]
fn instances() -> Vec<InstanceSpec> {
    let mut instances = Vec::new();
    for size in [20, 40, 80] {
        for density in [0.0, 0.1, 0.25] {
            for seed in 0..3 {
                instances.push(InstanceSpec { size, density, seed });
            }
        }
    }
    instances
}

#[cfg(feature = "prof")]
pub fn main() {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use skyfleet_planner::{
        terms::{FleetAwareTerms, NeutralTerms},
        Cell, Grid, GridSize, PathPlanner, PlannerConfig, RiskMap,
    };
    use skyfleet_structs::agent::Agent;
    use std::time::Instant;

    let terms: [(&str, fn(PathPlanner) -> PathPlanner); 2] = [
        ("neutral", |p| p.with_terms(NeutralTerms)),
        ("fleet", |p| p.with_terms(FleetAwareTerms::default())),
    ];

    println!("------------------------");
    println!("skyfleet A* benchmarking");
    println!("------------------------");
    println!();
    println!("  cost terms: {}", terms.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", "));
    println!();

    let instances = instances();
    let mut results: Vec<Vec<Result>> = Vec::new();

    println!("# RUNNING {} INSTANCES", instances.len());
    for instance in instances.iter() {
        results.push(Vec::new());
        let _p = hprof::enter("instance");
        let (grid, risk) = {
            let _p = hprof::enter("generate");
            let mut rng = StdRng::seed_from_u64(instance.seed);
            let size = GridSize::new(instance.size, instance.size, 5);
            let mut grid = Grid::new(size, 10.0).unwrap();
            let mut risk = RiskMap::new(size);
            for x in 0..size.x {
                for y in 0..size.y {
                    for z in 0..size.z {
                        let c = Cell::new(x, y, z);
                        if c != Cell::new(0, 0, 0) && c != Cell::new(size.x - 1, size.y - 1, 0) {
                            if rng.random_range(0.0..1.0) < instance.density {
                                grid.set_occupied(c, true);
                            }
                        }
                        risk.set(&c, rng.random_range(0.0..0.3));
                    }
                }
            }
            println!(
                " * instance {}x{} density {:.2} seed {}: {} occupied cells",
                instance.size,
                instance.size,
                instance.density,
                instance.seed,
                grid.occupied_count()
            );
            (grid, risk)
        };

        let agent = Agent::new("bench", grid.center_of(&Cell::new(0, 0, 0)));
        let goal = grid.center_of(&Cell::new(instance.size - 1, instance.size - 1, 0));
        for (name, with_terms) in &terms {
            println!("   - planning with: \"{}\"", name);
            let planner = with_terms(PathPlanner::with_grid(grid.clone(), PlannerConfig::default()));
            let _p0 = hprof::enter("plan");
            let t0 = Instant::now();
            let path = planner.plan(&agent, agent.position, goal, &risk);
            let time = t0.elapsed().as_secs_f32();
            results.last_mut().unwrap().push(Result {
                time,
                hops: skyfleet_planner::path_hops(&path),
                cost: path.last().map(|n| n.cost).unwrap_or(f32::INFINITY),
            });
        }
    }
    println!();
    println!("# PROFILER");
    hprof::profiler().print_timing();
    println!();

    println!("# RESULTS");

    use std::io::Write;
    let table = Vec::new();
    let mut tablewriter = tabwriter::TabWriter::new(table);
    write!(&mut tablewriter, "size\tdensity\tseed").unwrap();
    for (name, _) in &terms {
        write!(&mut tablewriter, "\t|\t{}\t\t", name).unwrap();
    }
    writeln!(&mut tablewriter).unwrap();

    write!(&mut tablewriter, "\t\t").unwrap();
    for _ in &terms {
        write!(&mut tablewriter, "\t|\ttime\thops\tcost").unwrap();
    }
    writeln!(&mut tablewriter).unwrap();

    write!(&mut tablewriter, "---\t---\t---").unwrap();
    for _ in &terms {
        write!(&mut tablewriter, "\t\t---\t---\t---").unwrap();
    }
    writeln!(&mut tablewriter).unwrap();

    for (instance, instance_results) in instances.iter().zip(results.iter()) {
        write!(&mut tablewriter, "{}\t{:.2}\t{}", instance.size, instance.density, instance.seed).unwrap();
        for result in instance_results.iter() {
            write!(&mut tablewriter, "\t|\t{:.4}\t{}\t{:.1}", result.time, result.hops, result.cost).unwrap();
        }
        writeln!(&mut tablewriter).unwrap();
    }

    let written = String::from_utf8(tablewriter.into_inner().unwrap()).unwrap();
    println!("{}", written);
}
