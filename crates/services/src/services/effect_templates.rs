//! Built-in template catalogue.
//!
//! Templates carry `{{NAME}}` placeholders. `{{FRAME_TIME}}` is left for
//! the optimizer; everything else is filled by the code generator.

use db::models::effect::EffectType;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub effect_type: EffectType,
    /// How cheap the template is to run, in [0, 1]
    pub performance: f64,
    /// Complexity the template suits best, in [0, 1]
    pub complexity: f64,
    /// Energy the template suits best, in [0, 1]
    pub energy: f64,
    pub base_code: &'static str,
}

pub const JAVASCRIPT_TEMPLATES: &[EffectTemplate] = &[
    EffectTemplate {
        id: "particle-system",
        name: "Particle System",
        category: "particles",
        effect_type: EffectType::Javascript,
        performance: 0.85,
        complexity: 0.3,
        energy: 0.8,
        base_code: PARTICLE_SYSTEM_JS,
    },
    EffectTemplate {
        id: "css-animation-wrapper",
        name: "CSS Animation Wrapper",
        category: "animation",
        effect_type: EffectType::Javascript,
        performance: 0.9,
        complexity: 0.1,
        energy: 0.2,
        base_code: CSS_ANIMATION_WRAPPER_JS,
    },
    EffectTemplate {
        id: "canvas-effect",
        name: "Canvas Effect",
        category: "canvas",
        effect_type: EffectType::Javascript,
        performance: 0.8,
        complexity: 0.7,
        energy: 0.3,
        base_code: CANVAS_EFFECT_JS,
    },
];

pub const CSS_TEMPLATES: &[EffectTemplate] = &[
    EffectTemplate {
        id: "transform",
        name: "Transform Animation",
        category: "transform",
        effect_type: EffectType::Css,
        performance: 0.95,
        complexity: 0.3,
        energy: 0.5,
        base_code: TRANSFORM_CSS,
    },
    EffectTemplate {
        id: "keyframe-glow",
        name: "Keyframe Glow",
        category: "glow",
        effect_type: EffectType::Css,
        performance: 0.9,
        complexity: 0.4,
        energy: 0.7,
        base_code: KEYFRAME_GLOW_CSS,
    },
];

pub const AFTER_EFFECTS_TEMPLATES: &[EffectTemplate] = &[
    EffectTemplate {
        id: "expression",
        name: "Orbit Expression",
        category: "expression",
        effect_type: EffectType::AfterEffects,
        performance: 0.85,
        complexity: 0.5,
        energy: 0.5,
        base_code: ORBIT_EXPRESSION_AE,
    },
    EffectTemplate {
        id: "wiggle-expression",
        name: "Wiggle Expression",
        category: "expression",
        effect_type: EffectType::AfterEffects,
        performance: 0.9,
        complexity: 0.3,
        energy: 0.8,
        base_code: WIGGLE_EXPRESSION_AE,
    },
];

/// Templates available for `effect_type`. A type without templates of its
/// own falls back to the JavaScript set.
pub fn templates_for(effect_type: EffectType) -> &'static [EffectTemplate] {
    let templates = match effect_type {
        EffectType::Javascript => JAVASCRIPT_TEMPLATES,
        EffectType::Css => CSS_TEMPLATES,
        EffectType::AfterEffects => AFTER_EFFECTS_TEMPLATES,
    };
    if templates.is_empty() {
        JAVASCRIPT_TEMPLATES
    } else {
        templates
    }
}

const PARTICLE_SYSTEM_JS: &str = r#"const TARGET_FPS = {{TARGET_FPS}};
const MAX_MEMORY_MB = {{MAX_MEMORY}};
const FRAME_BUDGET_MS = {{FRAME_TIME}};

class ParticleSystem {
  constructor(canvas) {
    this.canvas = canvas;
    this.ctx = canvas.getContext('2d');
    this.concept = '{{PRIMARY_CONCEPT}}';
    this.energy = {{ENERGY}};
    this.complexity = {{COMPLEXITY}};
    this.elegance = {{ELEGANCE}};
    this.particleCount = {{PARTICLE_COUNT}};
    this.pool = new Array({{PARTICLE_COUNT}});
    this.particles = [];
    this.timer = null;
  }

  spawn() {
    while (this.particles.length < this.particleCount) {
      const speed = 1 + this.energy * 6;
      this.particles.push({
        x: this.canvas.width / 2,
        y: this.canvas.height / 2,
        vx: (Math.random() - 0.5) * speed,
        vy: (Math.random() - 0.5) * speed,
        life: 1,
      });
    }
  }

  applyPhysics(particle) {
    particle.vy += 0.05 * (1 - this.elegance);
    particle.x += particle.vx;
    particle.y += particle.vy;
    particle.life -= 0.01 + this.energy * 0.02;
  }

  tick() {
    this.ctx.clearRect(0, 0, this.canvas.width, this.canvas.height);
    this.particles = this.particles.filter((p) => p.life > 0);
    this.spawn();
    const size = 2 + this.complexity * 3;
    for (const particle of this.particles) {
      this.applyPhysics(particle);
      this.ctx.globalAlpha = particle.life;
      this.ctx.fillRect(particle.x, particle.y, size, size);
    }
  }

  start() {
    this.canvas.addEventListener('click', () => this.spawn());
    this.timer = setInterval(() => this.tick(), FRAME_BUDGET_MS);
  }
}

{{CONSTITUTION}}
"#;

const CSS_ANIMATION_WRAPPER_JS: &str = r#"const TARGET_FPS = {{TARGET_FPS}};
const FRAME_BUDGET_MS = {{FRAME_TIME}};

function oneClickInit(selector) {
  const element = document.querySelector(selector);
  if (!element) {
    return null;
  }
  const duration = Math.max(200, 1600 - {{ENERGY}} * 1200);
  element.style.animation = `{{PRIMARY_CONCEPT}}-motion ${duration}ms cubic-bezier(0.4, 0, 0.2, 1) infinite`;
  element.style.setProperty('--effect-elegance', '{{ELEGANCE}}');
  element.style.setProperty('--effect-complexity', '{{COMPLEXITY}}');
  element.addEventListener('click', () => {
    element.style.animationPlayState =
      element.style.animationPlayState === 'paused' ? 'running' : 'paused';
  });
  return element;
}

{{CONSTITUTION}}
"#;

const CANVAS_EFFECT_JS: &str = r#"const TARGET_FPS = {{TARGET_FPS}};
const MAX_MEMORY_MB = {{MAX_MEMORY}};
const FRAME_BUDGET_MS = {{FRAME_TIME}};

class CanvasEffect {
  constructor(canvas) {
    this.canvas = canvas;
    this.ctx = canvas.getContext('2d');
    this.quality = { antialias: true, pixelRatio: window.devicePixelRatio || 1 };
    this.concept = '{{PRIMARY_CONCEPT}}';
    this.energy = {{ENERGY}};
    this.complexity = {{COMPLEXITY}};
    this.elegance = {{ELEGANCE}};
    this.entityCount = {{PARTICLE_COUNT}};
    this.phase = 0;
    this.lastFrame = 0;
  }

  draw(now) {
    if (now - this.lastFrame >= FRAME_BUDGET_MS) {
      this.lastFrame = now;
      this.phase += 0.02 + this.energy * 0.08;
      const { width, height } = this.canvas;
      const spread = 0.05 + this.complexity * 0.2;
      this.ctx.clearRect(0, 0, width, height);
      this.ctx.beginPath();
      for (let i = 0; i < this.entityCount; i += 1) {
        const x = (i / this.entityCount) * width;
        const y = height / 2 + Math.sin(i * spread + this.phase) * height * 0.3;
        this.ctx.lineTo(x, y);
      }
      this.ctx.lineWidth = 1 + this.elegance * 2;
      this.ctx.stroke();
    }
    requestAnimationFrame((t) => this.draw(t));
  }
}

{{CONSTITUTION}}
"#;

const TRANSFORM_CSS: &str = r#":root {
  --effect-energy: {{ENERGY}};
  --effect-complexity: {{COMPLEXITY}};
  --effect-elegance: {{ELEGANCE}};
  --effect-frame-ms: {{FRAME_TIME}}ms;
}

.{{PRIMARY_CONCEPT}}-effect {
  transform-origin: center;
  will-change: transform, opacity;
  animation: {{PRIMARY_CONCEPT}}-transform calc(1.6s - var(--effect-energy) * 1.2s) ease-in-out infinite alternate;
}

@keyframes {{PRIMARY_CONCEPT}}-transform {
  from {
    transform: scale(1) rotate(0deg);
    opacity: 1;
  }
  to {
    transform: scale(calc(1 + var(--effect-energy) * 0.4)) rotate(calc(var(--effect-complexity) * 180deg));
    opacity: calc(0.6 + var(--effect-elegance) * 0.4);
  }
}

{{CONSTITUTION}}
"#;

const KEYFRAME_GLOW_CSS: &str = r#".{{PRIMARY_CONCEPT}}-glow {
  --glow-strength: calc(8px + {{ENERGY}} * 24px);
  --glow-frame-ms: {{FRAME_TIME}}ms;
  animation: {{PRIMARY_CONCEPT}}-glow-pulse calc(2s - {{ENERGY}} * 1.4s) ease-in-out infinite;
}

@keyframes {{PRIMARY_CONCEPT}}-glow-pulse {
  0%, 100% {
    filter: drop-shadow(0 0 var(--glow-strength) currentColor);
  }
  50% {
    filter: drop-shadow(0 0 calc(var(--glow-strength) * 2) currentColor) blur(calc({{COMPLEXITY}} * 2px));
    opacity: calc(0.7 + {{ELEGANCE}} * 0.3);
  }
}

{{CONSTITUTION}}
"#;

const ORBIT_EXPRESSION_AE: &str = r#"// {{PRIMARY_CONCEPT}} orbit, {{TARGET_FPS}} fps
var energy = {{ENERGY}};
var complexity = {{COMPLEXITY}};
var elegance = {{ELEGANCE}};
var frameBudget = {{FRAME_TIME}} / 1000;
var amp = 20 + energy * 80;
var freq = 1 + complexity * 4;
var t = Math.floor(time / frameBudget) * frameBudget;
var ease = 1 - elegance * 0.5;
[value[0] + Math.sin(t * freq * Math.PI * 2) * amp * ease, value[1] + Math.cos(t * freq * Math.PI * 2) * amp * ease];

{{CONSTITUTION}}
"#;

const WIGGLE_EXPRESSION_AE: &str = r#"// {{PRIMARY_CONCEPT}} wiggle
var energy = {{ENERGY}};
var complexity = {{COMPLEXITY}};
var elegance = {{ELEGANCE}};
var frameBudget = {{FRAME_TIME}};
posterizeTime({{TARGET_FPS}});
wiggle(1 + energy * 6 + complexity * 2, 10 + energy * 60 * (1 - elegance / 2));

{{CONSTITUTION}}
"#;
