use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

pub const COOLDOWN_TICKS: usize = 100;
pub const FIT_PADDING: f64 = 50.0;

const ALPHA_MIN: f64 = 0.001;
const VELOCITY_DECAY: f64 = 0.4;
const CHARGE_STRENGTH: f64 = -30.0;
const LINK_DISTANCE: f64 = 30.0;
const INITIAL_RADIUS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Body {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
}

/// Velocity-Verlet force simulation: many-body repulsion, spring links, centring.
pub struct ForceSimulation {
    bodies: Vec<Body>,
    links: Vec<(usize, usize)>,
    link_strength: Vec<f64>,
    link_bias: Vec<f64>,
    alpha: f64,
    alpha_decay: f64,
    rng: StdRng,
}

impl ForceSimulation {
    /// Nodes start on a phyllotaxis spiral; links index into the node list.
    pub fn new(node_count: usize, links: Vec<(usize, usize)>) -> Self {
        let golden_angle = PI * (3.0 - 5f64.sqrt());
        let bodies = (0..node_count)
            .map(|i| {
                let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
                let angle = i as f64 * golden_angle;
                Body {
                    x: radius * angle.cos(),
                    y: radius * angle.sin(),
                    ..Default::default()
                }
            })
            .collect();

        let links: Vec<(usize, usize)> = links
            .into_iter()
            .filter(|(s, t)| *s < node_count && *t < node_count)
            .collect();

        let mut degree = vec![0usize; node_count];
        for &(s, t) in &links {
            degree[s] += 1;
            degree[t] += 1;
        }
        let link_strength = links
            .iter()
            .map(|&(s, t)| 1.0 / degree[s].min(degree[t]).max(1) as f64)
            .collect();
        let link_bias = links
            .iter()
            .map(|&(s, t)| degree[s] as f64 / (degree[s] + degree[t]).max(1) as f64)
            .collect();

        Self {
            bodies,
            links,
            link_strength,
            link_bias,
            alpha: 1.0,
            alpha_decay: 1.0 - ALPHA_MIN.powf(1.0 / 300.0),
            rng: StdRng::seed_from_u64(node_count as u64),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn positions(&self) -> Vec<Point> {
        self.bodies.iter().map(|b| Point { x: b.x, y: b.y }).collect()
    }

    /// Run until the tick budget is spent or the simulation cools below its floor
    pub fn run(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.alpha >= ALPHA_MIN {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    pub fn tick(&mut self) {
        self.alpha += (0.0 - self.alpha) * self.alpha_decay;

        self.apply_links();
        self.apply_charge();
        self.apply_center();

        for body in &mut self.bodies {
            body.vx *= 1.0 - VELOCITY_DECAY;
            body.vy *= 1.0 - VELOCITY_DECAY;
            body.x += body.vx;
            body.y += body.vy;
        }
    }

    fn jiggle(&mut self) -> f64 {
        (self.rng.gen_range(0.0..1.0) - 0.5) * 1e-6
    }

    fn apply_links(&mut self) {
        for i in 0..self.links.len() {
            let (s, t) = self.links[i];
            let (source, target) = (self.bodies[s], self.bodies[t]);

            let mut dx = target.x + target.vx - source.x - source.vx;
            let mut dy = target.y + target.vy - source.y - source.vy;
            if dx == 0.0 {
                dx = self.jiggle();
            }
            if dy == 0.0 {
                dy = self.jiggle();
            }

            let distance = (dx * dx + dy * dy).sqrt();
            let pull = (distance - LINK_DISTANCE) / distance * self.alpha * self.link_strength[i];
            let (fx, fy) = (dx * pull, dy * pull);
            let bias = self.link_bias[i];

            self.bodies[t].vx -= fx * bias;
            self.bodies[t].vy -= fy * bias;
            self.bodies[s].vx += fx * (1.0 - bias);
            self.bodies[s].vy += fy * (1.0 - bias);
        }
    }

    fn apply_charge(&mut self) {
        let snapshot: Vec<Body> = self.bodies.clone();
        for i in 0..snapshot.len() {
            for (j, other) in snapshot.iter().enumerate() {
                if i == j {
                    continue;
                }
                let mut dx = other.x - snapshot[i].x;
                let mut dy = other.y - snapshot[i].y;
                if dx == 0.0 {
                    dx = self.jiggle();
                }
                if dy == 0.0 {
                    dy = self.jiggle();
                }

                let mut l = dx * dx + dy * dy;
                if l < 1.0 {
                    l = l.sqrt();
                }
                let w = CHARGE_STRENGTH * self.alpha / l;
                self.bodies[i].vx += dx * w;
                self.bodies[i].vy += dy * w;
            }
        }
    }

    fn apply_center(&mut self) {
        if self.bodies.is_empty() {
            return;
        }
        let n = self.bodies.len() as f64;
        let sx = self.bodies.iter().map(|b| b.x).sum::<f64>() / n;
        let sy = self.bodies.iter().map(|b| b.y).sum::<f64>() / n;
        for body in &mut self.bodies {
            body.x -= sx;
            body.y -= sy;
        }
    }
}

/// Scale-and-translate that maps layout space into a viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub dx: f64,
    pub dy: f64,
}

impl ViewTransform {
    pub fn apply(&self, p: Point) -> Point {
        Point {
            x: p.x * self.scale + self.dx,
            y: p.y * self.scale + self.dy,
        }
    }

    /// Fit every point inside `width x height` leaving `padding` on each side
    pub fn zoom_to_fit(points: &[Point], width: f64, height: f64, padding: f64) -> Self {
        if points.is_empty() {
            return Self { scale: 1.0, dx: width / 2.0, dy: height / 2.0 };
        }

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        let box_w = (max_x - min_x).max(1e-9);
        let box_h = (max_y - min_y).max(1e-9);
        let avail_w = (width - 2.0 * padding).max(1.0);
        let avail_h = (height - 2.0 * padding).max(1.0);

        let scale = if points.len() == 1 { 1.0 } else { (avail_w / box_w).min(avail_h / box_h) };
        let cx = (min_x + max_x) / 2.0;
        let cy = (min_y + max_y) / 2.0;

        Self {
            scale,
            dx: width / 2.0 - cx * scale,
            dy: height / 2.0 - cy * scale,
        }
    }
}

/// Run the simulation for the cooldown budget and fit the result into the viewport,
/// keeping `padding` pixels (never less than `FIT_PADDING`) clear on each side
pub fn layout_graph(node_count: usize, links: Vec<(usize, usize)>, width: f64, height: f64, padding: f64) -> Vec<Point> {
    let mut simulation = ForceSimulation::new(node_count, links);
    let ticks = simulation.run(COOLDOWN_TICKS);
    let positions = simulation.positions();
    let transform = ViewTransform::zoom_to_fit(&positions, width, height, padding.max(FIT_PADDING));
    tracing::debug!(nodes = node_count, ticks, scale = transform.scale, "Force layout settled");
    positions.into_iter().map(|p| transform.apply(p)).collect()
}
