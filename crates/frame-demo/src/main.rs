use std::{error::Error, process};

use allocator::{Arena, ArenaError, MemoryContext, OsError};
use argh::FromArgs;
use containers::{
    BoundedArray, CapacityError, DynArray, EnumArray, EnumSet, Enumerant, Optional, OwnedBox,
    SliceExt as _, View, enumerant,
};
use rand::{Rng as _, SeedableRng as _, rngs::StdRng};
use snafu::{OptionExt as _, ResultExt as _};
use snafu_utils::{GenericError, Location, Report};

const MIB: usize = 1024 * 1024;
const ROSTER_CAPACITY: usize = 4;
const SEED: u64 = 0x5eed;

/// Run a simulated game loop on a permanent/temporary arena pair.
#[derive(Debug, FromArgs)]
struct Args {
    /// number of frames to simulate
    #[argh(option, default = "60")]
    frames: u32,

    /// temporary arena reservation in MiB
    #[argh(option, default = "8")]
    temporary_mib: usize,

    /// permanent arena reservation in MiB
    #[argh(option, default = "32")]
    permanent_mib: usize,

    /// number of objects spawned at startup
    #[argh(option, default = "64")]
    objects: usize,
}

enumerant! {
    enum Kind {
        Ship,
        Asteroid,
        Bullet,
    }
}

enumerant! {
    enum Event {
        Fire,
        Collision,
        Wrap,
    }
}

#[derive(Debug, Clone, Copy)]
struct Sound {
    name: &'static str,
    event: Event,
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    field_size: f32,
    hit_radius: f32,
}

impl Settings {
    const DEFAULT: Self = Self {
        field_size: 100.0,
        hit_radius: 2.5,
    };
}

#[derive(Debug, Clone, Copy)]
struct Object {
    kind: Kind,
    position: [f32; 2],
    velocity: [f32; 2],
}

impl Object {
    fn spawn(kind: Kind, rng: &mut StdRng, settings: &Settings) -> Self {
        let speed = match kind {
            Kind::Ship => 0.5,
            Kind::Asteroid => 1.0,
            Kind::Bullet => 4.0,
        };
        Self {
            kind,
            position: [
                rng.gen_range(0.0..settings.field_size),
                rng.gen_range(0.0..settings.field_size),
            ],
            velocity: [
                rng.gen_range(-0.5_f32..0.5) * speed,
                rng.gen_range(-0.5_f32..0.5) * speed,
            ],
        }
    }

    /// Moves one step, wrapping around the field. Returns `true` on wrap.
    fn advance(&mut self, settings: &Settings) -> bool {
        let mut wrapped = false;
        for (position, velocity) in self.position.iter_mut().zip(self.velocity) {
            *position += velocity;
            if !(0.0..settings.field_size).contains(&*position) {
                *position = position.rem_euclid(settings.field_size);
                wrapped = true;
            }
        }
        wrapped
    }

    fn distance(&self, other: &Self) -> f32 {
        let dx = self.position[0] - other.position[0];
        let dy = self.position[1] - other.position[1];
        dx.hypot(dy)
    }
}

fn main() {
    let args: Args = argh::from_env();
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(err) = run(&args) {
        eprintln!("{}", Report::new(err).with_locator(locate));
        process::exit(1);
    }
}

fn locate(error: &(dyn Error + 'static)) -> Option<Location> {
    snafu_utils::locate_as::<GenericError>(error)
        .or_else(|| snafu_utils::locate_as::<ArenaError>(error))
        .or_else(|| snafu_utils::locate_as::<OsError>(error))
}

fn run(args: &Args) -> Result<(), GenericError> {
    let permanent_size = args
        .permanent_mib
        .checked_mul(MIB)
        .whatever_context("permanent arena size overflows")?;
    let temporary_size = args
        .temporary_mib
        .checked_mul(MIB)
        .whatever_context("temporary arena size overflows")?;
    let mut memory = MemoryContext::with_sizes(permanent_size, temporary_size)
        .whatever_context("failed to create memory context")?;

    let roster = sound_roster()?;
    let (permanent, mut frames) = memory.split();
    let stored_settings = OwnedBox::new_in(Settings::DEFAULT, permanent)
        .whatever_context("failed to store settings")?;
    let settings = stored_settings.value_or(&Settings::DEFAULT);

    // Fixed seed so runs are reproducible.
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut objects = DynArray::with_capacity_in(args.objects, permanent)
        .whatever_context("failed to allocate object storage")?;
    for index in 0..args.objects {
        let kind = Kind::from_index(index % Kind::COUNT).unwrap_or(Kind::Asteroid);
        objects
            .push(Object::spawn(kind, &mut rng, settings))
            .map_err(CapacityError::simplify)
            .whatever_context("failed to spawn object")?;
    }
    log::info!(
        "spawned {} objects, permanent arena uses {} bytes",
        objects.len(),
        permanent.used()
    );

    let mut totals = EnumArray::<Event, u32, { Event::COUNT }>::default();
    let mut last_hit = Optional::empty();
    for _ in 0..args.frames {
        let events = simulate(&mut objects, settings, frames.temporary(), &mut last_hit)?;
        for event in events.iter() {
            totals[event] += 1;
            if let Some(index) = roster.find_if(|sound| sound.event == event) {
                log::debug!("play sound {}", roster[index].name);
            }
        }
        log::debug!(
            "frame {}: events {:?}, temporary arena {} bytes used, {} committed",
            frames.frame_index(),
            events,
            frames.temporary().used(),
            frames.temporary().committed()
        );
        frames.begin_frame();
    }

    for (event, count) in totals.iter() {
        log::info!("{event:?}: {count} frames");
    }
    last_hit.if_present_else(
        |index| log::info!("last asteroid hit: #{index}"),
        || log::info!("no asteroid was hit"),
    );
    log::info!(
        "temporary arena committed {} bytes in {} commits over {} frames",
        frames.temporary().committed(),
        frames.temporary().commit_count(),
        frames.frame_index()
    );
    Ok(())
}

fn sound_roster() -> Result<BoundedArray<Sound, ROSTER_CAPACITY>, GenericError> {
    BoundedArray::from_slice(&[
        Sound {
            name: "laser",
            event: Event::Fire,
        },
        Sound {
            name: "explosion",
            event: Event::Collision,
        },
    ])
    .whatever_context("sound roster exceeds its capacity")
}

/// Advances every object and collects the frame's events. Scratch data
/// lives in `scratch`, which is reset after the frame.
fn simulate(
    objects: &mut DynArray<Object, &Arena>,
    settings: &Settings,
    scratch: &Arena,
    last_hit: &mut Optional<usize>,
) -> Result<EnumSet<Event>, GenericError> {
    let mut events = EnumSet::new();
    let mut bullets = DynArray::new_in(scratch);
    for (index, object) in objects.iter_mut().enumerate() {
        if object.advance(settings) {
            events.insert(Event::Wrap);
        }
        if object.kind == Kind::Bullet {
            bullets
                .push(index)
                .map_err(CapacityError::simplify)
                .whatever_context("frame scratch exhausted")?;
        }
    }
    if !bullets.is_empty() {
        events.insert(Event::Fire);
    }

    let world = View::from(objects.as_slice());
    for &bullet in &bullets {
        let hit = world.find_if(|object| {
            object.kind == Kind::Asteroid && object.distance(&world[bullet]) < settings.hit_radius
        });
        if let Some(hit) = hit {
            events.insert(Event::Collision);
            last_hit.set_value(hit);
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_all(seed: u64) -> Vec<[f32; 4]> {
        let mut rng = StdRng::seed_from_u64(seed);
        Kind::ALL
            .iter()
            .map(|&kind| {
                let object = Object::spawn(kind, &mut rng, &Settings::DEFAULT);
                [
                    object.position[0],
                    object.position[1],
                    object.velocity[0],
                    object.velocity[1],
                ]
            })
            .collect()
    }

    #[test]
    fn test_spawn_is_reproducible() {
        assert_eq!(spawn_all(SEED), spawn_all(SEED));
        assert_ne!(spawn_all(SEED), spawn_all(SEED + 1));
    }

    #[test]
    fn test_spawn_stays_inside_field() {
        let mut rng = StdRng::seed_from_u64(SEED);
        for _ in 0..100 {
            let object = Object::spawn(Kind::Bullet, &mut rng, &Settings::DEFAULT);
            for position in object.position {
                assert!((0.0..Settings::DEFAULT.field_size).contains(&position));
            }
            for velocity in object.velocity {
                assert!(velocity.abs() <= 2.0);
            }
        }
    }

    #[test]
    fn test_locate_recognizes_library_errors() {
        let err = MemoryContext::with_sizes(0, 1 << 20).unwrap_err();
        assert!(locate(&err).is_some());
    }
}
