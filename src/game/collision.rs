//! Ball-vs-obstacle and ball-vs-ball collision resolution

use glam::Vec2;

use super::state::{Ball, Obstacle};

/// Contact between a ball and an obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit normal pointing from the obstacle surface toward the ball centre
    pub normal: Vec2,
    /// How far the ball has sunk into the obstacle
    pub penetration: f32,
}

/// Collision detection and response
pub struct CollisionResolver;

impl CollisionResolver {
    /// Find the contact between `ball` and `obstacle`, if they overlap.
    ///
    /// When the centre lies on or inside the rectangle the closest-point
    /// normal has zero length; the nearest face is used instead.
    pub fn contact(ball: &Ball, obstacle: &Obstacle) -> Option<Contact> {
        let radius = ball.radius();
        let closest = obstacle.closest_point(ball.position);
        let offset = ball.position - closest;
        let distance = offset.length();

        if distance >= radius {
            return None;
        }

        match offset.try_normalize() {
            Some(normal) => Some(Contact {
                normal,
                penetration: radius - distance,
            }),
            None => Some(Self::nearest_face(ball.position, radius, obstacle)),
        }
    }

    /// Exit through the face closest to a centre that is inside the rectangle
    fn nearest_face(center: Vec2, radius: f32, obstacle: &Obstacle) -> Contact {
        let faces = [
            (center.x - obstacle.x, Vec2::new(-1.0, 0.0)),
            (obstacle.right() - center.x, Vec2::new(1.0, 0.0)),
            (center.y - obstacle.y, Vec2::new(0.0, -1.0)),
            (obstacle.bottom() - center.y, Vec2::new(0.0, 1.0)),
        ];

        let (depth, normal) = faces
            .into_iter()
            .fold(faces[0], |best, face| if face.0 < best.0 { face } else { best });

        Contact {
            normal,
            penetration: depth.max(0.0) + radius,
        }
    }

    /// Push `ball` out of every obstacle it overlaps and bounce it.
    ///
    /// Obstacles are handled once each, in order, without relaxation, so a
    /// ball wedged between two obstacles may remain slightly inside one.
    /// Returns the number of contacts resolved.
    pub fn resolve(ball: &mut Ball, obstacles: &[Obstacle], restitution: f32) -> usize {
        let mut hits = 0;
        for obstacle in obstacles {
            if let Some(contact) = Self::contact(ball, obstacle) {
                Self::apply(ball, contact, restitution);
                hits += 1;
            }
        }
        hits
    }

    /// Separate along the contact normal, then reflect: `v' = v - (1+e)(v·n)n`
    pub fn apply(ball: &mut Ball, contact: Contact, restitution: f32) {
        ball.position += contact.normal * contact.penetration;

        let approach = ball.velocity.dot(contact.normal);
        if approach < 0.0 {
            ball.velocity -= contact.normal * ((1.0 + restitution) * approach);
        }
    }

    /// Equal-mass contact between two balls.
    ///
    /// Exchanges the normal velocity components when the balls approach and
    /// splits the overlap evenly. Coincident centres are skipped for the tick.
    /// Returns true when the balls were in contact.
    pub fn resolve_ball_ball(a: &mut Ball, b: &mut Ball) -> bool {
        let min_distance = a.radius() + b.radius();
        let delta = b.position - a.position;
        let distance = delta.length();

        if distance >= min_distance {
            return false;
        }

        let Some(normal) = delta.try_normalize() else {
            return false;
        };

        let push = (min_distance - distance) / 2.0;
        a.position -= normal * push;
        b.position += normal * push;

        let impulse = (a.velocity - b.velocity).dot(normal);
        if impulse > 0.0 {
            a.velocity -= normal * impulse;
            b.velocity += normal * impulse;
        }

        true
    }
}
