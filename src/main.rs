//! Circuit Kit - demo circuit runner
//!
//! Steps one of the built-in circuits frame by frame and prints the element
//! currents and vertex voltages as a table.
//!
//! # Usage
//!
//! ```bash
//! circuit-kit rc --frames 300 --every 30
//! ```

use clap::{Parser, ValueEnum};
use circuit_kit_core::{
    circuit::{ElementId, Point, VertexId},
    components::{Battery, Capacitor, ElementKind, Inductor, LightBulb, Resistor, Switch},
    error::Result,
    solver::IntegrationMethod,
    Circuit, CircuitConfig, DEFAULT_FRAME_DT,
};

/// Built-in demo circuits
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// 9 V battery charging a 0.1 F capacitor through 10 ohms
    Rc,
    /// 9 V battery driving a 5 H inductor through 10 ohms
    Rl,
    /// A self-heating bulb in series with a fixed bulb
    Bulbs,
    /// A resistor loop whose switch closes halfway through the run
    Switch,
}

/// Real-time circuit simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Circuit to run
    #[arg(value_enum)]
    scenario: Scenario,

    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 120)]
    frames: usize,

    /// Frame length in seconds
    #[arg(long, default_value_t = DEFAULT_FRAME_DT)]
    dt: f64,

    /// Print a row every N frames
    #[arg(short, long, default_value_t = 10)]
    every: usize,

    /// Integrate with the trapezoidal rule instead of backward Euler
    #[arg(long)]
    trapezoidal: bool,
}

/// Four corners of a square, going round clockwise from the origin.
fn square(circuit: &mut Circuit) -> [VertexId; 4] {
    [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]
        .map(|(x, y)| circuit.create_vertex(Point::new(x, y)))
}

/// Build the scenario. Returns the switch to close midway, if any.
fn build(circuit: &mut Circuit, scenario: Scenario) -> Result<Option<ElementId>> {
    let v = square(circuit);
    circuit.add_element(v[0], v[1], ElementKind::Battery(Battery::new(9.0)))?;

    let mut switch = None;
    match scenario {
        Scenario::Rc => {
            circuit.add_element(v[1], v[2], ElementKind::Resistor(Resistor::new(10.0)))?;
            circuit.add_element(v[2], v[3], ElementKind::Capacitor(Capacitor::new(0.1)))?;
        }
        Scenario::Rl => {
            circuit.add_element(v[1], v[2], ElementKind::Resistor(Resistor::new(10.0)))?;
            circuit.add_element(v[2], v[3], ElementKind::Inductor(Inductor::new(5.0)))?;
        }
        Scenario::Bulbs => {
            circuit.add_element(v[1], v[2], ElementKind::LightBulb(LightBulb::real()))?;
            circuit.add_element(v[2], v[3], ElementKind::LightBulb(LightBulb::new(10.0)))?;
        }
        Scenario::Switch => {
            circuit.add_element(v[1], v[2], ElementKind::Resistor(Resistor::new(10.0)))?;
            switch = Some(circuit.add_element(
                v[2],
                v[3],
                ElementKind::Switch(Switch::new(false)),
            )?);
        }
    }
    circuit.add_wire(v[3], v[0])?;
    Ok(switch)
}

fn print_header(circuit: &Circuit) {
    let mut columns = vec![format!("{:>10}", "time")];
    columns.extend(
        circuit
            .elements()
            .map(|e| format!("{:>14}", format!("I({}:{})", e.kind.type_name(), e.id))),
    );
    columns.extend(circuit.vertices().map(|v| format!("{:>10}", format!("V({})", v.id))));
    println!("{}", columns.join(" "));
}

fn print_row(circuit: &Circuit) {
    let mut columns = vec![format!("{:>10.4}", circuit.time())];
    columns.extend(circuit.elements().map(|e| format!("{:>14.6}", e.current)));
    columns.extend(circuit.vertices().map(|v| format!("{:>10.4}", v.voltage)));
    println!("{}", columns.join(" "));
}

fn main() -> Result<()> {
    let args = Args::parse();

    let method = if args.trapezoidal {
        IntegrationMethod::Trapezoidal
    } else {
        IntegrationMethod::BackwardEuler
    };
    let mut circuit = Circuit::with_config(CircuitConfig::new().with_integration_method(method))?;
    let switch = build(&mut circuit, args.scenario)?;

    print_header(&circuit);
    let every = args.every.max(1);
    for frame in 0..args.frames {
        if let Some(switch) = switch.filter(|_| frame == args.frames / 2) {
            circuit.set_switch_closed(switch, true)?;
        }
        circuit.step(args.dt);
        if frame % every == 0 || frame + 1 == args.frames {
            print_row(&circuit);
        }
    }

    Ok(())
}
