//! Ball movement, wall/paddle collision and scoring

use std::time::Duration;

use rand::Rng;

use super::vector::Vector2;
use super::{SlotIndex, LEFT, RIGHT};

/// Field geometry shared with clients. Fixed for the life of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldGeometry {
    pub field_width: f64,
    pub field_height: f64,
    /// Gap between a paddle and its edge of the field
    pub paddle_to_edge: f64,
    pub paddle_width: f64,
    pub paddle_height: f64,
    pub ball_radius: f64,
    /// Pixels per second
    pub starting_speed: f64,
    /// Added to the speed on every paddle hit
    pub speed_increment: f64,
}

impl FieldGeometry {
    /// Distance from the edge at which paddle collision is tested
    pub fn reach(&self) -> f64 {
        self.paddle_to_edge + self.paddle_width
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(self.field_width / 2.0, self.field_height / 2.0)
    }

    fn half_paddle(&self) -> f64 {
        self.paddle_height / 2.0
    }
}

impl Default for FieldGeometry {
    fn default() -> Self {
        Self {
            field_width: 400.0,
            field_height: 300.0,
            paddle_to_edge: 5.0,
            paddle_width: 6.0,
            paddle_height: 50.0,
            ball_radius: 3.0,
            starting_speed: 40.0,
            speed_increment: 15.0,
        }
    }
}

/// Ball kinematic state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub position: Vector2,
    /// Always one of [`Vector2::DIRECTIONS`] up to axis mirroring
    pub direction: Vector2,
    pub speed: f64,
}

impl Ball {
    /// Ball at the center of the field heading south-west
    pub fn kickoff(geometry: &FieldGeometry) -> Self {
        Self {
            position: geometry.center(),
            direction: Vector2::SW,
            speed: geometry.starting_speed,
        }
    }

    /// Re-serve from the center line at a random height and diagonal
    pub fn serve<R: Rng>(geometry: &FieldGeometry, rng: &mut R) -> Self {
        let r = geometry.ball_radius;
        let y = rng.gen_range(r..=geometry.field_height - r);
        let direction = Vector2::DIRECTIONS[rng.gen_range(0..Vector2::DIRECTIONS.len())];

        Self {
            position: Vector2::new(geometry.field_width / 2.0, y),
            direction,
            speed: geometry.starting_speed,
        }
    }
}

/// What a single tick produced, in broadcast order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// Side that scored this tick, if any
    pub scored: Option<SlotIndex>,
    /// Ball position after the tick (after any reset)
    pub position: Vector2,
}

/// Advance the ball by `elapsed` and resolve collisions and scoring.
///
/// `paddles` holds the live vertical center of the left and right paddle.
/// Wall and paddle checks are independent, so a corner hit can mirror both
/// axes in the same tick.
pub fn advance_ball<R: Rng>(
    ball: &mut Ball,
    score: &mut [u32; 2],
    paddles: [f64; 2],
    geometry: &FieldGeometry,
    elapsed: Duration,
    rng: &mut R,
) -> TickOutcome {
    let g = geometry;
    let r = g.ball_radius;

    ball.position = ball.position + ball.direction * (ball.speed * elapsed.as_secs_f64());

    // Top wall
    if ball.position.y < r {
        ball.position.y = r;
        ball.direction = ball.direction.mirror_y();
    }
    // Bottom wall
    if ball.position.y > g.field_height - r {
        ball.position.y = g.field_height - r;
        ball.direction = ball.direction.mirror_y();
    }

    let left_bound = g.reach() + r;
    if ball.position.x < left_bound && paddle_covers(g, paddles[LEFT], ball.position.y) {
        ball.position.x = left_bound;
        ball.direction = ball.direction.mirror_x();
        ball.speed += g.speed_increment;
    }

    let right_bound = g.field_width - (g.reach() + r);
    if ball.position.x > right_bound && paddle_covers(g, paddles[RIGHT], ball.position.y) {
        ball.position.x = right_bound;
        ball.direction = ball.direction.mirror_x();
        ball.speed += g.speed_increment;
    }

    let mut scored = None;
    if ball.position.x < 0.0 || ball.position.x > g.field_width {
        let scorer = if ball.position.x < 0.0 { RIGHT } else { LEFT };
        score[scorer] += 1;
        scored = Some(scorer);
        *ball = Ball::serve(g, rng);
    }

    TickOutcome {
        scored,
        position: ball.position,
    }
}

fn paddle_covers(geometry: &FieldGeometry, paddle_y: f64, ball_y: f64) -> bool {
    ball_y >= paddle_y - geometry.half_paddle() && ball_y <= paddle_y + geometry.half_paddle()
}
