//! Physics world: gravity, a static ground plane and the one die.
//!
//! Semi-implicit integration, face-clipping ground contacts, an impulse
//! solver with Coulomb friction, rolling resistance and sleep detection.
//! `step` reports contact onsets; resolving the outcome is left to callers.

use log::{debug, trace, warn};
use nalgebra::{Point3, Quaternion, UnitQuaternion, Vector3};

use crate::body::{Material, RigidBody, CUBE_FACES};
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::{Real, EPS};

/// Horizontal static collider. Never moves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundPlane {
    height: Real,
    half_extent: Option<Real>,
}

impl GroundPlane {
    pub fn new(height: Real, half_extent: Option<Real>) -> Self {
        Self {
            height,
            half_extent,
        }
    }

    pub fn height(&self) -> Real {
        self.height
    }

    /// Half size in X and Z, `None` when infinite.
    pub fn half_extent(&self) -> Option<Real> {
        self.half_extent
    }

    pub fn normal(&self) -> Vector3<Real> {
        Vector3::y()
    }

    /// Whether a point lies over the plane's surface.
    pub fn covers(&self, p: &Point3<Real>) -> bool {
        match self.half_extent {
            Some(e) => p.x.abs() <= e && p.z.abs() <= e,
            None => true,
        }
    }
}

/// Onset of contact between the die and the ground.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionEvent {
    /// Simulation time at the end of the substep that made contact.
    pub time: Real,
    /// Mean of the contact points.
    pub point: Point3<Real>,
    /// Closing speed along the ground normal before the impulse.
    pub impact_speed: Real,
}

/// Contact representation (single contact point from a clipped face)
struct Contact {
    point_world: Point3<Real>,
    penetration: Real,     // positive if penetrating
    r: Vector3<Real>,      // vector from body position to contact point
    normal: Vector3<Real>, // contact normal, out of the ground
}

pub struct PhysicsWorld {
    gravity: Vector3<Real>,
    ground: GroundPlane,
    body: RigidBody,

    max_substep: Real,
    max_substeps: u32,
    solver_iterations: usize,
    sleep_linear: Real,
    sleep_angular: Real,
    sleep_time: Real,

    elapsed: Real,
    in_contact: bool,
    rest_accum: Real,
    sleeping: bool,
}

impl PhysicsWorld {
    /// Build the world with the die resting at the launch point.
    /// Fails on any configuration that would make the solver ill-defined.
    pub fn new(config: &SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let die = &config.die;
        let mut body = RigidBody::cube(die.half_extent, die.mass, Material::from(die));
        body.reset_pose(config.launch.launch_point());

        let [gx, gy, gz] = config.world.gravity;
        let solver = &config.solver;
        Ok(Self {
            gravity: Vector3::new(gx, gy, gz),
            ground: GroundPlane::new(config.world.ground_height, config.world.ground_half_extent),
            body,
            max_substep: solver.max_substep,
            max_substeps: solver.max_substeps,
            solver_iterations: solver.iterations,
            sleep_linear: solver.sleep_linear,
            sleep_angular: solver.sleep_angular,
            sleep_time: solver.sleep_time,
            elapsed: 0.0,
            in_contact: false,
            rest_accum: 0.0,
            sleeping: false,
        })
    }

    pub fn body(&self) -> &RigidBody {
        &self.body
    }

    pub fn ground(&self) -> &GroundPlane {
        &self.ground
    }

    pub fn gravity(&self) -> &Vector3<Real> {
        &self.gravity
    }

    /// Total simulated time.
    pub fn elapsed(&self) -> Real {
        self.elapsed
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Whether the last substep ended touching the ground.
    pub fn in_contact(&self) -> bool {
        self.in_contact
    }

    /// Teleport the die. The next touchdown counts as a new contact onset.
    pub fn reset_pose(&mut self, position: Point3<Real>) {
        self.body.reset_pose(position);
        self.in_contact = false;
        self.wake();
    }

    pub fn set_velocity(&mut self, v: Vector3<Real>) {
        self.body.set_velocity(v);
        self.wake();
    }

    pub fn set_angular_velocity(&mut self, w: Vector3<Real>) {
        self.body.set_angular_velocity(w);
        self.wake();
    }

    fn wake(&mut self) {
        self.sleeping = false;
        self.rest_accum = 0.0;
    }

    /// Advance by `dt` seconds. Never fails: a non-positive or non-finite
    /// `dt` leaves the world untouched. Returns one event per contact onset.
    pub fn step(&mut self, dt: Real) -> Vec<CollisionEvent> {
        let mut events = Vec::new();
        if !dt.is_finite() {
            warn!("ignoring non-finite time step {}", dt);
            return events;
        }
        if dt <= 0.0 {
            return events;
        }

        let wanted = (dt / self.max_substep).ceil() as u32;
        let n = wanted.clamp(1, self.max_substeps);
        if wanted > n {
            warn!(
                "frame of {:.4}s wants {} substeps, capped at {}",
                dt, wanted, n
            );
        }
        let h = dt / n as Real;

        for _ in 0..n {
            if let Some(event) = self.substep(h) {
                debug!(
                    "contact onset at t={:.3}s, impact speed {:.3}",
                    event.time, event.impact_speed
                );
                events.push(event);
            }
        }
        trace!(
            "stepped {:.4}s in {} substeps, die at {:?}",
            dt,
            n,
            self.body.position
        );
        events
    }

    fn substep(&mut self, h: Real) -> Option<CollisionEvent> {
        self.elapsed += h;
        if self.sleeping {
            return None;
        }

        // integration (semi-implicit)
        let body = &mut self.body;
        body.velocity += self.gravity * h;
        body.position += body.velocity * h;

        // angular integration: quaternion derivative q' = 0.5 * ω_quat * q
        let w = body.angular_velocity;
        let q = body.orientation.quaternion();
        let dq = Quaternion::from_parts(0.0, w) * q * 0.5 * h;
        let qnew = Quaternion::new(q.w + dq.w, q.i + dq.i, q.j + dq.j, q.k + dq.k);
        body.orientation = UnitQuaternion::new_normalize(qnew);

        // contacts & solver
        let mut onset: Option<(Point3<Real>, Real)> = None;
        for iter in 0..self.solver_iterations {
            let contacts = detect_ground_contacts(&self.body, &self.ground);
            if iter == 0 && !contacts.is_empty() {
                onset = Some(summarize_contacts(&self.body, &contacts));
            }
            for c in &contacts {
                resolve_contact_impulses(&mut self.body, c);
                positional_correction(&mut self.body, c);
            }
        }
        let touching = onset.is_some();

        if touching {
            let body = &mut self.body;
            // rolling resistance torque -> angular damping
            let inv_iw = body.inv_inertia_world();
            let tau = -body.angular_velocity * body.material().roll_resistance * body.mass();
            body.angular_velocity += inv_iw * tau * h;

            // if still penetrating after the solver, lift out
            let plane = self.ground.height();
            let min_y = body
                .vertices_world()
                .iter()
                .map(|v| v.y)
                .fold(Real::INFINITY, Real::min);
            if min_y < plane {
                body.position.y += plane - min_y + 1e-5;
                if body.velocity.y.abs() < 0.1 {
                    body.velocity.y = 0.0;
                }
            }
        }

        self.update_sleep(touching, h);

        let was_touching = self.in_contact;
        self.in_contact = touching;
        match onset {
            Some((point, impact_speed)) if !was_touching => Some(CollisionEvent {
                time: self.elapsed,
                point,
                impact_speed,
            }),
            _ => None,
        }
    }

    fn update_sleep(&mut self, touching: bool, h: Real) {
        let body = &mut self.body;
        if touching
            && body.velocity.norm() < self.sleep_linear
            && body.angular_velocity.norm() < self.sleep_angular
        {
            self.rest_accum += h;
        } else {
            self.rest_accum = 0.0;
        }

        if self.rest_accum >= self.sleep_time {
            body.velocity.fill(0.0);
            body.angular_velocity.fill(0.0);
            self.sleeping = true;
            debug!("die asleep at {:?}", body.position);
        }
    }
}

/// Mean contact point and largest closing speed, taken before any impulse.
fn summarize_contacts(body: &RigidBody, contacts: &[Contact]) -> (Point3<Real>, Real) {
    let mut centroid = Vector3::zeros();
    let mut impact: Real = 0.0;
    for c in contacts {
        centroid += c.point_world.coords;
        let vn = body.point_velocity(&c.r).dot(&c.normal);
        impact = impact.max(-vn);
    }
    centroid /= contacts.len() as Real;
    (Point3::from(centroid), impact)
}

/// Detect ground contacts by clipping each cube face against the plane.
/// For faces reaching below the surface, the clipped polygon's centroid is
/// the contact point. Points outside a finite ground are dropped.
fn detect_ground_contacts(body: &RigidBody, ground: &GroundPlane) -> Vec<Contact> {
    let mut contacts = Vec::new();
    let plane = ground.height();
    let verts = body.vertices_world();

    for face in CUBE_FACES.iter() {
        let poly: Vec<Point3<Real>> = face.iter().map(|&vi| verts[vi]).collect();
        if poly.iter().all(|p| p.y >= plane) {
            continue;
        }

        // Sutherland–Hodgman against the half-space y <= plane
        let mut output: Vec<Point3<Real>> = Vec::with_capacity(poly.len() + 1);
        for i in 0..poly.len() {
            let a = poly[i];
            let b = poly[(i + 1) % poly.len()];
            let a_inside = a.y <= plane;
            let b_inside = b.y <= plane;
            match (a_inside, b_inside) {
                (true, true) => output.push(b),
                (true, false) => {
                    let t = (plane - a.y) / (b.y - a.y);
                    output.push(a + (b - a) * t);
                }
                (false, true) => {
                    let t = (plane - a.y) / (b.y - a.y);
                    output.push(a + (b - a) * t);
                    output.push(b);
                }
                (false, false) => {}
            }
        }
        if output.is_empty() {
            continue;
        }

        // centroid of clipped polygon and average penetration (>0)
        let mut centroid = Vector3::zeros();
        let mut avg_pen = 0.0;
        for p in &output {
            centroid += p.coords;
            avg_pen += plane - p.y;
        }
        let count = output.len() as Real;
        centroid /= count;
        avg_pen /= count;

        let point_world = Point3::from(centroid);
        if !ground.covers(&point_world) {
            continue;
        }
        contacts.push(Contact {
            point_world,
            penetration: avg_pen.max(0.0),
            r: centroid - body.position.coords,
            normal: ground.normal(),
        });
    }

    contacts
}

/// Resolve normal + friction impulses for a single contact against the
/// static ground.
fn resolve_contact_impulses(body: &mut RigidBody, c: &Contact) {
    let n = c.normal;
    let material = *body.material();
    let v_rel = body.point_velocity(&c.r);
    let vn = v_rel.dot(&n);

    // inv_mass + n·((I^-1 (r×n)) × r)
    let inv_i = body.inv_inertia_world();
    let r_cross_n = c.r.cross(&n);
    let angular = (inv_i * r_cross_n).cross(&c.r).dot(&n);
    let denom = body.inv_mass() + angular;

    // restitution only while closing
    let mut jn = 0.0;
    if vn < 0.0 {
        jn = (-(1.0 + material.restitution) * vn / denom.max(EPS)).max(0.0);
    }
    body.apply_impulse_at_point(n * jn, c.r);

    // friction impulse (Coulomb)
    let v_rel_post = body.point_velocity(&c.r);
    let vt = v_rel_post - n * v_rel_post.dot(&n);
    let vt_len = vt.norm();
    if vt_len > 1e-6 {
        let t = vt / vt_len;
        let r_cross_t = c.r.cross(&t);
        let ang_t = (inv_i * r_cross_t).cross(&c.r).dot(&t);
        let denom_t = body.inv_mass() + ang_t;
        let jt = -v_rel_post.dot(&t) / denom_t.max(EPS);

        // clamp to the friction cone; jf keeps the sign of jt so it opposes slip
        let max_static = material.static_friction * jn;
        let jf = if jt.abs() > max_static {
            material.dynamic_friction * jn * jt.signum()
        } else {
            jt
        };
        body.apply_impulse_at_point(t * jf, c.r);
    }
}

/// Baumgarte-like positional correction against sinking. A distance, so
/// independent of mass.
fn positional_correction(body: &mut RigidBody, c: &Contact) {
    let percent = 0.2;
    // slop relative to die size (corner distance)
    let slop = 0.01 * body.half_extent() * (3.0 as Real).sqrt();
    let corr_mag = (c.penetration - slop).max(0.0) * percent;
    if corr_mag <= 0.0 {
        return;
    }
    body.position += c.normal * corr_mag;
}
