//! Interactive topic browser written as one self-contained HTML page.
//!
//! The page shows an inter-topic distance map and, for the selected topic, a
//! bar chart of its most relevant terms. Relevance of term `w` to topic `t` is
//!
//! ```text
//! λ · log p(w|t) + (1 − λ) · log(p(w|t) / p(w))
//! ```
//!
//! where `p(w)` is the corpus-wide term probability. A slider adjusts `λ`.
//! Topic positions come from Jensen-Shannon distances between topic-term
//! distributions projected to two dimensions by classical multidimensional
//! scaling.

use std::collections::BTreeSet;
use std::io::Write as _;
use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument};

use super::VizError;
use crate::fs_policy::{DirectoryPolicy, write_artifact};
use crate::model::TopicModel;

/// Terms shown per topic.
pub const DEFAULT_RELEVANT_TERMS: usize = 15;

/// Initial slider position.
pub const DEFAULT_LAMBDA: f64 = 0.6;

/// Slider resolution used when collecting candidate terms.
const LAMBDA_STEPS: u32 = 100;

const POWER_ITERATIONS: usize = 500;

/// Browser settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserOptions {
    /// Terms shown per topic (`R`).
    pub relevant_terms: usize,
    /// Initial `λ`.
    pub lambda: f64,
    /// Page title.
    pub title: String,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            relevant_terms: DEFAULT_RELEVANT_TERMS,
            lambda: DEFAULT_LAMBDA,
            title: "Topic model".to_string(),
        }
    }
}

/// Everything the page script needs, embedded as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowserData {
    /// Terms shown per topic.
    pub relevant_terms: usize,
    /// Initial `λ`.
    pub lambda: f64,
    /// One entry per topic.
    pub topics: Vec<TopicView>,
    /// The most frequent terms overall, shown when no topic is selected.
    pub overall: Vec<TermView>,
}

/// A topic on the distance map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicView {
    /// Topic index.
    pub id: usize,
    /// Map coordinates.
    pub x: f64,
    /// Map coordinates.
    pub y: f64,
    /// Share of corpus tokens.
    pub proportion: f64,
    /// Terms that reach the top `R` for some slider position.
    pub candidates: Vec<TermView>,
}

/// A term with the statistics the bar chart and relevance need.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermView {
    /// The term.
    pub term: String,
    /// Corpus count.
    pub total: f64,
    /// Estimated count within the topic (equal to `total` in the overall view).
    pub in_topic: f64,
    /// `ln p(w|t)`.
    pub log_prob: f64,
    /// `ln(p(w|t) / p(w))`.
    pub log_lift: f64,
}

/// Relevance of a term with topic probability `p_wt` and marginal `p_w`.
#[must_use]
pub fn relevance(p_wt: f64, p_w: f64, lambda: f64) -> f64 {
    lambda * p_wt.ln() + (1.0 - lambda) * (p_wt / p_w).ln()
}

/// Jensen-Shannon distance (square root of the base-2 divergence), in `[0, 1]`.
#[must_use]
pub fn jensen_shannon_distance(p: &[f64], q: &[f64]) -> f64 {
    let kl_to_mid = |a: &[f64], b: &[f64]| -> f64 {
        a.iter()
            .zip(b)
            .filter(|(x, _)| **x > 0.0)
            .map(|(x, y)| {
                let m = 0.5 * (x + y);
                x * (x / m).log2()
            })
            .sum()
    };
    let divergence = 0.5 * kl_to_mid(p, q) + 0.5 * kl_to_mid(q, p);
    divergence.max(0.0).sqrt()
}

/// Classical multidimensional scaling of a symmetric distance matrix into
/// `dims` coordinates per point.
///
/// Uses power iteration with deflation on the double-centered squared
/// distances; dimensions with non-positive eigenvalues collapse to zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn classical_mds(distances: &[Vec<f64>], dims: usize) -> Vec<Vec<f64>> {
    let n = distances.len();
    if n == 0 {
        return Vec::new();
    }

    let squared: Vec<Vec<f64>> = distances
        .iter()
        .map(|row| row.iter().map(|d| d * d).collect())
        .collect();
    let row_means: Vec<f64> = squared.iter().map(|r| r.iter().sum::<f64>() / n as f64).collect();
    let grand_mean = row_means.iter().sum::<f64>() / n as f64;
    let mut b: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| -0.5 * (squared[i][j] - row_means[i] - row_means[j] + grand_mean))
                .collect()
        })
        .collect();

    let mut coords = vec![vec![0.0; dims]; n];
    for dim in 0..dims {
        // Deterministic start that is not orthogonal to typical eigenvectors.
        let mut v: Vec<f64> = (0..n).map(|i| 1.0 + i as f64 / n as f64).collect();
        let mut eigenvalue = 0.0;
        for _ in 0..POWER_ITERATIONS {
            let w: Vec<f64> = b
                .iter()
                .map(|row| row.iter().zip(&v).map(|(a, x)| a * x).sum())
                .collect();
            let norm = w.iter().map(|x| x * x).sum::<f64>().sqrt();
            if norm < 1e-12 {
                eigenvalue = 0.0;
                break;
            }
            v = w.into_iter().map(|x| x / norm).collect();
            eigenvalue = b
                .iter()
                .zip(&v)
                .map(|(row, vi)| vi * row.iter().zip(&v).map(|(a, x)| a * x).sum::<f64>())
                .sum();
        }
        if eigenvalue <= 1e-12 {
            continue;
        }
        let scale = eigenvalue.sqrt();
        for i in 0..n {
            coords[i][dim] = v[i] * scale;
        }
        for i in 0..n {
            for j in 0..n {
                b[i][j] -= eigenvalue * v[i] * v[j];
            }
        }
    }
    coords
}

impl BrowserData {
    /// Derives page data from a fitted model.
    ///
    /// # Errors
    ///
    /// Returns [`VizError::InvalidModel`] for a model without topics or terms,
    /// or a `λ` outside `[0, 1]`.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_model(model: &TopicModel, options: &BrowserOptions) -> Result<Self, VizError> {
        if model.num_topics() == 0 || model.num_terms() == 0 {
            return Err(VizError::InvalidModel {
                reason: "model has no topics or no terms".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&options.lambda) {
            return Err(VizError::InvalidModel {
                reason: format!("lambda {} is outside [0, 1]", options.lambda),
            });
        }

        let terms = model.terms();
        let counts = model.term_counts();
        let total_tokens: u64 = counts.iter().sum();
        if total_tokens == 0 {
            return Err(VizError::InvalidModel {
                reason: "model has no term counts".to_string(),
            });
        }
        let marginal: Vec<f64> = counts
            .iter()
            .map(|&c| (c as f64).max(0.5) / total_tokens as f64)
            .collect();

        let distributions: Vec<&[f64]> = (0..model.num_topics())
            .filter_map(|t| model.topic_term_distribution(t))
            .collect();
        let distances: Vec<Vec<f64>> = distributions
            .iter()
            .map(|p| distributions.iter().map(|q| jensen_shannon_distance(p, q)).collect())
            .collect();
        let coords = classical_mds(&distances, 2);
        let proportions = model.topic_proportions();
        let r = options.relevant_terms.max(1);

        let topics = distributions
            .iter()
            .enumerate()
            .map(|(id, phi)| {
                let mut candidates: BTreeSet<usize> = BTreeSet::new();
                for step in 0..=LAMBDA_STEPS {
                    let lambda = f64::from(step) / f64::from(LAMBDA_STEPS);
                    candidates.extend(top_by(phi.len(), r, |w| relevance(phi[w], marginal[w], lambda)));
                }
                let topic_tokens = proportions[id] * total_tokens as f64;
                TopicView {
                    id,
                    x: coords[id][0],
                    y: coords[id][1],
                    proportion: proportions[id],
                    candidates: candidates
                        .into_iter()
                        .map(|w| TermView {
                            term: terms[w].clone(),
                            total: counts[w] as f64,
                            in_topic: (phi[w] * topic_tokens).min(counts[w] as f64),
                            log_prob: phi[w].ln(),
                            log_lift: (phi[w] / marginal[w]).ln(),
                        })
                        .collect(),
                }
            })
            .collect();

        let overall = top_by(terms.len(), r, |w| counts[w] as f64)
            .into_iter()
            .map(|w| TermView {
                term: terms[w].clone(),
                total: counts[w] as f64,
                in_topic: counts[w] as f64,
                log_prob: marginal[w].ln(),
                log_lift: 0.0,
            })
            .collect();

        Ok(Self {
            relevant_terms: r,
            lambda: options.lambda,
            topics,
            overall,
        })
    }

    /// Renders the page.
    ///
    /// # Errors
    ///
    /// Returns [`VizError::Encode`] when the data cannot be serialized.
    pub fn to_html(&self, title: &str) -> Result<String, VizError> {
        let json = serde_json::to_string(self)?.replace("</", "<\\/");
        Ok(PAGE_TEMPLATE
            .replace("{{TITLE}}", &escape_html(title))
            .replace("{{DATA}}", &json))
    }
}

/// Builds the browser page for `model` and writes it to `path`.
///
/// # Errors
///
/// Returns errors from [`BrowserData::from_model`], [`BrowserData::to_html`],
/// or [`VizError::Io`].
#[instrument(skip(model, options), fields(topics = model.num_topics()))]
pub fn write_browser(
    model: &TopicModel,
    options: &BrowserOptions,
    path: &Path,
    policy: DirectoryPolicy,
) -> Result<(), VizError> {
    let data = BrowserData::from_model(model, options)?;
    let html = data.to_html(&options.title)?;
    write_artifact(path, policy, |out| out.write_all(html.as_bytes()))
        .map_err(|e| VizError::io(path, e))?;
    info!(path = %path.display(), "topic browser written");
    Ok(())
}

/// Indices of the `n` highest scores; ties keep index order.
fn top_by(len: usize, n: usize, score: impl Fn(usize) -> f64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    let scores: Vec<f64> = indices.iter().map(|&i| score(i)).collect();
    indices.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    indices.truncate(n);
    indices
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{TITLE}}</title>
<style>
  body { font-family: "DejaVu Sans", Arial, sans-serif; margin: 16px; color: #222; }
  #controls { margin-bottom: 12px; }
  #panes { display: flex; gap: 24px; align-items: flex-start; }
  #map circle { fill: #3288bd; fill-opacity: 0.45; stroke: #5e4fa2; cursor: pointer; }
  #map circle.selected { fill: #d53e4f; stroke: #9e0142; }
  #map text { font-size: 12px; pointer-events: none; }
  .bar-row { display: flex; align-items: center; font-size: 12px; height: 18px; }
  .bar-label { width: 110px; text-align: right; padding-right: 6px; }
  .bar-track { position: relative; width: 360px; height: 14px; }
  .bar-total { position: absolute; height: 14px; background: #abdda4; }
  .bar-topic { position: absolute; height: 14px; background: #d53e4f; }
</style>
</head>
<body>
<h1>{{TITLE}}</h1>
<div id="controls">
  <label>Topic <select id="topic"></select></label>
  <label>&lambda; = <span id="lambda-value"></span>
    <input id="lambda" type="range" min="0" max="1" step="0.01"></label>
</div>
<div id="panes">
  <svg id="map" width="420" height="420" viewBox="0 0 420 420"></svg>
  <div><h2 id="bars-title"></h2><div id="bars"></div></div>
</div>
<script id="topic-data" type="application/json">{{DATA}}</script>
<script>
(function () {
  "use strict";
  var data = JSON.parse(document.getElementById("topic-data").textContent);
  var selected = -1;
  var lambda = data.lambda;
  var svgNs = "http://www.w3.org/2000/svg";
  var map = document.getElementById("map");
  var select = document.getElementById("topic");
  var slider = document.getElementById("lambda");

  function drawMap() {
    while (map.firstChild) { map.removeChild(map.firstChild); }
    var xs = data.topics.map(function (t) { return t.x; });
    var ys = data.topics.map(function (t) { return t.y; });
    var span = Math.max(Math.max.apply(null, xs) - Math.min.apply(null, xs),
                        Math.max.apply(null, ys) - Math.min.apply(null, ys), 1e-9);
    var cx = (Math.max.apply(null, xs) + Math.min.apply(null, xs)) / 2;
    var cy = (Math.max.apply(null, ys) + Math.min.apply(null, ys)) / 2;
    data.topics.forEach(function (t) {
      var px = 210 + (t.x - cx) / span * 280;
      var py = 210 - (t.y - cy) / span * 280;
      var circle = document.createElementNS(svgNs, "circle");
      circle.setAttribute("cx", px);
      circle.setAttribute("cy", py);
      circle.setAttribute("r", 8 + 60 * Math.sqrt(t.proportion));
      if (t.id === selected) { circle.setAttribute("class", "selected"); }
      circle.addEventListener("click", function () { choose(t.id === selected ? -1 : t.id); });
      map.appendChild(circle);
      var label = document.createElementNS(svgNs, "text");
      label.setAttribute("x", px);
      label.setAttribute("y", py + 4);
      label.setAttribute("text-anchor", "middle");
      label.textContent = String(t.id + 1);
      map.appendChild(label);
    });
  }

  function drawBars() {
    var rows;
    var title;
    if (selected < 0) {
      rows = data.overall;
      title = "Most frequent terms";
    } else {
      var topic = data.topics[selected];
      rows = topic.candidates.slice().sort(function (a, b) {
        var ra = lambda * a.log_prob + (1 - lambda) * a.log_lift;
        var rb = lambda * b.log_prob + (1 - lambda) * b.log_lift;
        return rb - ra;
      }).slice(0, data.relevant_terms);
      title = "Topic " + (selected + 1) + " (" + (100 * topic.proportion).toFixed(1) + "% of tokens)";
    }
    document.getElementById("bars-title").textContent = title;
    var max = Math.max.apply(null, rows.map(function (r) { return r.total; }).concat([1]));
    var bars = document.getElementById("bars");
    bars.innerHTML = "";
    rows.forEach(function (r) {
      var row = document.createElement("div");
      row.className = "bar-row";
      var label = document.createElement("span");
      label.className = "bar-label";
      label.textContent = r.term;
      var track = document.createElement("span");
      track.className = "bar-track";
      var total = document.createElement("span");
      total.className = "bar-total";
      total.style.width = (360 * r.total / max) + "px";
      track.appendChild(total);
      if (selected >= 0) {
        var inTopic = document.createElement("span");
        inTopic.className = "bar-topic";
        inTopic.style.width = (360 * r.in_topic / max) + "px";
        track.appendChild(inTopic);
      }
      row.appendChild(label);
      row.appendChild(track);
      bars.appendChild(row);
    });
  }

  function choose(id) {
    selected = id;
    select.value = String(id);
    drawMap();
    drawBars();
  }

  var none = document.createElement("option");
  none.value = "-1";
  none.textContent = "(all)";
  select.appendChild(none);
  data.topics.forEach(function (t) {
    var option = document.createElement("option");
    option.value = String(t.id);
    option.textContent = "Topic " + (t.id + 1);
    select.appendChild(option);
  });
  select.addEventListener("change", function () { choose(parseInt(select.value, 10)); });
  slider.value = String(lambda);
  document.getElementById("lambda-value").textContent = lambda.toFixed(2);
  slider.addEventListener("input", function () {
    lambda = parseFloat(slider.value);
    document.getElementById("lambda-value").textContent = lambda.toFixed(2);
    drawBars();
  });
  choose(-1);
}());
</script>
</body>
</html>
"##;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::corpus::{CorpusBuilder, PruneThresholds};
    use crate::model::{LdaParams, LdaTrainer};

    fn small_model() -> TopicModel {
        let mut documents = Vec::new();
        for i in 0..40 {
            let words: &[&str] = if i % 2 == 0 {
                &["gene", "protein", "cell", "gene"]
            } else {
                &["patient", "hospital", "care", "patient"]
            };
            documents.push(words.iter().map(ToString::to_string).collect::<Vec<_>>());
        }
        let built = CorpusBuilder::new(PruneThresholds::new(1, 1.0))
            .build(&documents)
            .unwrap();
        LdaTrainer::new(LdaParams::new(2).with_iterations(50))
            .fit(&built.vocabulary, &built.corpus)
            .unwrap()
    }

    #[test]
    fn test_jensen_shannon_distance_bounds() {
        let p = [0.5, 0.5, 0.0];
        let q = [0.0, 0.0, 1.0];
        assert!(jensen_shannon_distance(&p, &p).abs() < 1e-12);
        assert!((jensen_shannon_distance(&p, &q) - 1.0).abs() < 1e-9);
        let r = [0.25, 0.5, 0.25];
        let d = jensen_shannon_distance(&p, &r);
        assert!(d > 0.0 && d < 1.0);
        assert!((d - jensen_shannon_distance(&r, &p)).abs() < 1e-12);
    }

    #[test]
    fn test_classical_mds_preserves_distances_of_planar_points() {
        // Right triangle with legs 3 and 4.
        let points = [(0.0_f64, 0.0_f64), (3.0, 0.0), (0.0, 4.0)];
        let distances: Vec<Vec<f64>> = points
            .iter()
            .map(|a| points.iter().map(|b| (a.0 - b.0).hypot(a.1 - b.1)).collect())
            .collect();
        let coords = classical_mds(&distances, 2);
        for i in 0..3 {
            for j in 0..3 {
                let d = (coords[i][0] - coords[j][0]).hypot(coords[i][1] - coords[j][1]);
                assert!((d - distances[i][j]).abs() < 1e-6, "{i},{j}: {d}");
            }
        }
    }

    #[test]
    fn test_relevance_mixes_probability_and_lift() {
        let p_wt = 0.2;
        let p_w = 0.05;
        assert!((relevance(p_wt, p_w, 1.0) - p_wt.ln()).abs() < 1e-12);
        assert!((relevance(p_wt, p_w, 0.0) - 4.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_browser_data_shapes() {
        let model = small_model();
        let data = BrowserData::from_model(&model, &BrowserOptions::default()).unwrap();
        assert_eq!(data.topics.len(), 2);
        assert_eq!(data.relevant_terms, DEFAULT_RELEVANT_TERMS);
        for topic in &data.topics {
            assert!(!topic.candidates.is_empty());
            assert!(topic.candidates.len() <= model.num_terms());
            assert!(topic.x.is_finite() && topic.y.is_finite());
        }
        assert!(data.overall.len() <= DEFAULT_RELEVANT_TERMS);
        assert_eq!(data.overall[0].term, "gene");
    }

    #[test]
    fn test_invalid_lambda_rejected() {
        let options = BrowserOptions {
            lambda: 1.5,
            ..BrowserOptions::default()
        };
        assert!(matches!(
            BrowserData::from_model(&small_model(), &options).unwrap_err(),
            VizError::InvalidModel { .. }
        ));
    }

    #[test]
    fn test_html_embeds_escaped_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ldamodel_viz.html");
        let options = BrowserOptions {
            title: "Topics <2020>".to_string(),
            ..BrowserOptions::default()
        };
        write_browser(&small_model(), &options, &path, DirectoryPolicy::Create).unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("<title>Topics &lt;2020&gt;</title>"));
        assert!(html.contains(r#""relevant_terms":15"#));
        assert!(html.contains(r#""term":"patient""#));
        assert!(!html.contains("{{DATA}}"));

        let start = html.find(r#"type="application/json">"#).unwrap();
        let end = html[start..].find("</script>").unwrap() + start;
        let json = &html[start + r#"type="application/json">"#.len()..end];
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["topics"].as_array().unwrap().len(), 2);
    }
}
