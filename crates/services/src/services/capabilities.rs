//! Named boilerplate fragments spliced into generated code.
//!
//! Each [`Capability`] owns one block and the marker substrings whose
//! presence in code stands in for "this capability exists". Blocks are
//! top-level JavaScript so they can be appended to any script without
//! clashing with template classes.

use db::models::effect::{Capability, EffectCode, EffectType};

pub mod markers {
    pub const AUTO_CALIBRATION: &str = "autoCalibrate";
    pub const DEVICE_DETECTION: &str = "detectDevice";
    pub const PERFORMANCE_MONITOR: &str = "performanceMonitor";
    pub const CROSS_BROWSER: &str = "crossBrowser";
    pub const PLATFORM_DETECTION: &str = "detectPlatform";
    pub const CROSS_BROWSER_SETUP: &str = "crossBrowserSetup";
    pub const ONE_CLICK_INIT: &str = "oneClickInit";
    pub const RENDER_LOOP: &str = "requestAnimationFrame";
    pub const EVENT_BINDING: &str = "addEventListener";
    pub const WOW_FACTOR: &str = "wowFactor";
    pub const PHYSICS: &str = "applyPhysics";
    pub const ANTIALIASING: &str = "antialias";
    pub const IMMERSIVE: &str = "immersiveMode";
    pub const SURPRISE: &str = "surpriseVariation";
    pub const PROGRESS: &str = "progressFeedback";
    pub const INNOVATION: &str = "innovationEngine";
}

/// Markers a block provides. An empty slice means presence is judged some
/// other way (see [`is_present`]).
pub fn markers_for(capability: Capability) -> &'static [&'static str] {
    use markers::*;
    match capability {
        Capability::ConstitutionSetup => &[AUTO_CALIBRATION, DEVICE_DETECTION, PERFORMANCE_MONITOR],
        Capability::AutoCalibration => &[AUTO_CALIBRATION],
        Capability::DeviceDetection => &[DEVICE_DETECTION],
        Capability::PerformanceMonitor => &[PERFORMANCE_MONITOR],
        Capability::PlatformFallbacks => &[],
        Capability::CrossBrowser => &[PLATFORM_DETECTION, CROSS_BROWSER_SETUP],
        Capability::OneClickInit => &[ONE_CLICK_INIT],
        Capability::RenderLoop => &[RENDER_LOOP],
        Capability::EventBinding => &[EVENT_BINDING],
        Capability::WowFactor => &[WOW_FACTOR],
        Capability::Physics => &[PHYSICS],
        Capability::Antialiasing => &[ANTIALIASING],
        Capability::Immersive => &[IMMERSIVE],
        Capability::SurpriseVariation => &[SURPRISE],
        Capability::ProgressFeedback => &[PROGRESS],
        Capability::Innovation => &[INNOVATION],
    }
}

/// Whether `code` already provides what `capability` would add
pub fn is_present(capability: Capability, code: &EffectCode) -> bool {
    match capability {
        Capability::PlatformFallbacks => code.platforms_with_code() == 3,
        other => markers_for(other).iter().all(|marker| code.contains(marker)),
    }
}

/// JavaScript block for a capability. `ConstitutionSetup` and
/// `PlatformFallbacks` are type specific, see [`constitution_setup`] and
/// [`platform_fallback`].
pub fn block(capability: Capability) -> &'static str {
    match capability {
        Capability::ConstitutionSetup => constitution_setup(EffectType::Javascript),
        Capability::PlatformFallbacks => platform_fallback(EffectType::Javascript),
        Capability::AutoCalibration => AUTO_CALIBRATION_BLOCK,
        Capability::DeviceDetection => DEVICE_DETECTION_BLOCK,
        Capability::PerformanceMonitor => PERFORMANCE_MONITOR_BLOCK,
        Capability::CrossBrowser => CROSS_BROWSER_BLOCK,
        Capability::OneClickInit => ONE_CLICK_INIT_BLOCK,
        Capability::RenderLoop => RENDER_LOOP_BLOCK,
        Capability::EventBinding => EVENT_BINDING_BLOCK,
        Capability::WowFactor => WOW_FACTOR_BLOCK,
        Capability::Physics => PHYSICS_BLOCK,
        Capability::Antialiasing => ANTIALIASING_BLOCK,
        Capability::Immersive => IMMERSIVE_BLOCK,
        Capability::SurpriseVariation => SURPRISE_BLOCK,
        Capability::ProgressFeedback => PROGRESS_BLOCK,
        Capability::Innovation => INNOVATION_BLOCK,
    }
}

/// Setup block substituted for the `{{CONSTITUTION}}` placeholder
pub fn constitution_setup(effect_type: EffectType) -> &'static str {
    match effect_type {
        EffectType::Javascript => JS_CONSTITUTION_SETUP,
        EffectType::Css => CSS_CONSTITUTION_SETUP,
        EffectType::AfterEffects => AE_CONSTITUTION_SETUP,
    }
}

/// Minimal stand-in code for a platform that has none
pub fn platform_fallback(effect_type: EffectType) -> &'static str {
    match effect_type {
        EffectType::Javascript => JS_FALLBACK,
        EffectType::Css => CSS_FALLBACK,
        EffectType::AfterEffects => AE_FALLBACK,
    }
}

/// Append `block` to `code` separated by a blank line
pub fn append_block(code: &mut String, block: &str) {
    let trimmed = code.trim_end().len();
    code.truncate(trimmed);
    if !code.is_empty() {
        code.push_str("\n\n");
    }
    code.push_str(block.trim());
    code.push('\n');
}

const JS_CONSTITUTION_SETUP: &str = r#"const constitution = {
  autoCalibrate(effect, frameTimes) {
    if (!frameTimes || frameTimes.length === 0) {
      return 1;
    }
    const average = frameTimes.reduce((sum, t) => sum + t, 0) / frameTimes.length;
    effect.qualityScale = Math.max(0.25, Math.min(1, 16.67 / average));
    return effect.qualityScale;
  },
  detectDevice() {
    const nav = typeof navigator === 'undefined' ? {} : navigator;
    return {
      mobile: /Mobi|Android|iPhone|iPad/i.test(nav.userAgent || ''),
      cores: nav.hardwareConcurrency || 4,
    };
  },
  performanceMonitor: {
    samples: [],
    record(frameMs) {
      this.samples.push(frameMs);
      if (this.samples.length > 120) {
        this.samples.shift();
      }
    },
  },
};"#;

const CSS_CONSTITUTION_SETUP: &str = r#"/* constitution: autoCalibrate detectDevice performanceMonitor */
@media (prefers-reduced-motion: reduce) {
  * {
    animation-duration: 0.01ms !important;
    animation-iteration-count: 1 !important;
  }
}

@media (pointer: coarse) {
  :root {
    --effect-energy: 0.5;
  }
}"#;

const AE_CONSTITUTION_SETUP: &str = r#"// constitution: autoCalibrate detectDevice
var performanceMonitor = thisComp.frameDuration;"#;

const JS_FALLBACK: &str = r#"// static fallback when no script is generated
document.documentElement.classList.add('effect-fallback');"#;

const CSS_FALLBACK: &str = r#".effect-fallback {
  animation: effect-fallback-pulse 1.2s ease-in-out infinite;
}

@keyframes effect-fallback-pulse {
  0%, 100% { opacity: 1; }
  50% { opacity: 0.6; }
}"#;

const AE_FALLBACK: &str = r#"// fallback expression
wiggle(2, 10);"#;

const AUTO_CALIBRATION_BLOCK: &str = r#"function autoCalibrate(effect, frameTimes) {
  if (!frameTimes || frameTimes.length === 0) {
    return 1;
  }
  const average = frameTimes.reduce((sum, t) => sum + t, 0) / frameTimes.length;
  effect.qualityScale = Math.max(0.25, Math.min(1, 16.67 / average));
  return effect.qualityScale;
}"#;

const DEVICE_DETECTION_BLOCK: &str = r#"function detectDevice() {
  const nav = typeof navigator === 'undefined' ? {} : navigator;
  return {
    mobile: /Mobi|Android|iPhone|iPad/i.test(nav.userAgent || ''),
    cores: nav.hardwareConcurrency || 4,
    memoryGb: nav.deviceMemory || 4,
  };
}"#;

const PERFORMANCE_MONITOR_BLOCK: &str = r#"const performanceMonitor = {
  samples: [],
  record(frameMs) {
    this.samples.push(frameMs);
    if (this.samples.length > 120) {
      this.samples.shift();
    }
  },
  averageFps() {
    if (this.samples.length === 0) {
      return 0;
    }
    const mean = this.samples.reduce((sum, t) => sum + t, 0) / this.samples.length;
    return 1000 / mean;
  },
};"#;

const CROSS_BROWSER_BLOCK: &str = r#"function detectPlatform() {
  if (typeof window === 'undefined') {
    return 'server';
  }
  return /Mobi|Android/i.test(window.navigator.userAgent) ? 'mobile' : 'desktop';
}

function crossBrowserSetup(root) {
  const style = (root || document.documentElement).style;
  const transformKey = ['transform', 'webkitTransform', 'mozTransform', 'msTransform']
    .find((key) => key in style) || 'transform';
  return { transformKey, platform: detectPlatform() };
}"#;

const ONE_CLICK_INIT_BLOCK: &str = r#"function oneClickInit(effect, target) {
  const canvas = target || document.querySelector('canvas');
  if (!canvas) {
    return null;
  }
  const instance = typeof effect === 'function' ? new effect(canvas) : effect;
  if (instance && typeof instance.start === 'function') {
    instance.start();
  }
  return instance;
}"#;

const RENDER_LOOP_BLOCK: &str = r#"function renderLoop(step) {
  let last = 0;
  function frame(now) {
    step(now - last);
    last = now;
    requestAnimationFrame(frame);
  }
  requestAnimationFrame(frame);
}"#;

const EVENT_BINDING_BLOCK: &str = r#"function bindInteractions(target, effect) {
  target.addEventListener('pointermove', (event) => {
    effect.pointer = { x: event.clientX, y: event.clientY };
  });
  target.addEventListener('click', () => {
    effect.burst = true;
  });
}"#;

const WOW_FACTOR_BLOCK: &str = r#"const wowFactor = {
  bloom: 0.6,
  trailPersistence: 0.85,
  apply(ctx) {
    ctx.shadowBlur = 12 * this.bloom;
    ctx.globalCompositeOperation = 'lighter';
  },
};"#;

const PHYSICS_BLOCK: &str = r#"function applyPhysics(body, dt = 1) {
  body.vy = (body.vy || 0) + 0.098 * dt;
  body.vx = (body.vx || 0) * 0.99;
  body.x = (body.x || 0) + body.vx * dt;
  body.y = (body.y || 0) + body.vy * dt;
  return body;
}"#;

const ANTIALIASING_BLOCK: &str = r#"function enableSmoothing(ctx) {
  ctx.imageSmoothingEnabled = true;
  ctx.imageSmoothingQuality = 'high';
  return { antialias: true };
}"#;

const IMMERSIVE_BLOCK: &str = r#"function immersiveMode(element) {
  if (element && element.requestFullscreen) {
    return element.requestFullscreen();
  }
  return Promise.resolve();
}"#;

const SURPRISE_BLOCK: &str = r#"function surpriseVariation(seed) {
  const x = Math.sin(seed * 9301 + 49297) * 233280;
  return x - Math.floor(x);
}"#;

const PROGRESS_BLOCK: &str = r#"function progressFeedback(progress, onUpdate) {
  const clamped = Math.max(0, Math.min(1, progress));
  if (typeof onUpdate === 'function') {
    onUpdate(Math.round(clamped * 100));
  }
  return clamped;
}"#;

const INNOVATION_BLOCK: &str = r#"const innovationEngine = {
  generation: 0,
  evolve(params) {
    this.generation += 1;
    const drift = 0.95 + (Math.sin(this.generation * 12.9898) + 1) * 0.05;
    return Object.fromEntries(
      Object.entries(params).map(([key, value]) => [
        key,
        typeof value === 'number' ? value * drift : value,
      ]),
    );
  },
};"#;
