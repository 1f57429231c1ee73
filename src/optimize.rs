#[derive(Debug, Clone)]
pub struct MinimizeOptions {
    pub max_iter: usize,
    /// Relative spread of objective values that counts as converged.
    pub tolerance: f64,
    /// Initial simplex edge, relative to the start value (absolute at 0).
    pub initial_step: f64,
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        MinimizeOptions {
            max_iter: 2000,
            tolerance: 1e-10,
            initial_step: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone)]
struct Vertex {
    point: Vec<f64>,
    value: f64,
}

/// Nelder-Mead simplex search. `bounds[i]` clamps coordinate `i`; coordinates
/// past the end of `bounds` are unbounded. NaN objective values count as +inf.
pub fn minimize<F>(
    objective: F,
    start: &[f64],
    bounds: &[(f64, f64)],
    options: &MinimizeOptions,
) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_nan() {
            f64::INFINITY
        } else {
            v
        }
    };

    let n = start.len();
    let start = clamp(start.to_vec(), bounds);
    if n == 0 {
        return Minimum {
            value: eval(&start),
            point: start,
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex = Vec::with_capacity(n + 1);
    simplex.push(Vertex {
        value: eval(&start),
        point: start.clone(),
    });
    for i in 0..n {
        let step = if start[i].abs() > 1e-8 {
            options.initial_step * start[i].abs()
        } else {
            options.initial_step
        };
        let mut point = start.clone();
        point[i] += step;
        point = clamp(point, bounds);
        // Pinned against an upper bound: step the other way
        if point[i] == start[i] {
            point[i] -= step;
            point = clamp(point, bounds);
        }
        simplex.push(Vertex {
            value: eval(&point),
            point,
        });
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iter {
        iterations += 1;
        simplex.sort_by(|a, b| a.value.total_cmp(&b.value));

        let best = simplex[0].value;
        let worst = simplex[n].value;
        if worst - best <= options.tolerance * (1.0 + best.abs()) {
            converged = true;
            break;
        }

        let spread = simplex[1..]
            .iter()
            .map(|v| distance(&v.point, &simplex[0].point))
            .fold(0.0, f64::max);
        if spread < options.tolerance {
            converged = true;
            break;
        }

        let centroid = centroid(&simplex[..n]);
        let reflected = clamp(towards(&centroid, &simplex[n].point, -1.0), bounds);
        let reflected_value = eval(&reflected);

        if reflected_value < best {
            let expanded = clamp(towards(&centroid, &reflected, 2.0), bounds);
            let expanded_value = eval(&expanded);
            simplex[n] = if expanded_value < reflected_value {
                Vertex {
                    point: expanded,
                    value: expanded_value,
                }
            } else {
                Vertex {
                    point: reflected,
                    value: reflected_value,
                }
            };
            continue;
        }

        if reflected_value < simplex[n - 1].value {
            simplex[n] = Vertex {
                point: reflected,
                value: reflected_value,
            };
            continue;
        }

        let contracted = if reflected_value < worst {
            clamp(towards(&centroid, &reflected, 0.5), bounds)
        } else {
            clamp(towards(&centroid, &simplex[n].point, 0.5), bounds)
        };
        let contracted_value = eval(&contracted);
        if contracted_value < reflected_value.min(worst) {
            simplex[n] = Vertex {
                point: contracted,
                value: contracted_value,
            };
            continue;
        }

        let anchor = simplex[0].point.clone();
        for vertex in simplex.iter_mut().skip(1) {
            vertex.point = clamp(towards(&anchor, &vertex.point, 0.5), bounds);
            vertex.value = eval(&vertex.point);
        }
    }

    simplex.sort_by(|a, b| a.value.total_cmp(&b.value));
    let Vertex { point, value } = simplex.swap_remove(0);
    Minimum {
        point,
        value,
        iterations,
        converged,
    }
}

// from + t * (to - from)
fn towards(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(f, x)| f + t * (x - f)).collect()
}

fn centroid(vertices: &[Vertex]) -> Vec<f64> {
    let dim = vertices[0].point.len();
    let mut c = vec![0.0; dim];
    for v in vertices {
        for (acc, x) in c.iter_mut().zip(&v.point) {
            *acc += x;
        }
    }
    let count = vertices.len() as f64;
    c.iter_mut().for_each(|x| *x /= count);
    c
}

fn clamp(mut point: Vec<f64>, bounds: &[(f64, f64)]) -> Vec<f64> {
    for (x, &(lo, hi)) in point.iter_mut().zip(bounds) {
        *x = x.clamp(lo, hi);
    }
    point
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
