use log::warn;

/// Spanish interface strings. `{name}` placeholders are filled by [`t_with`].
const TRANSLATIONS: &[(&str, &str)] = &[
    // Status messages
    ("status.ready", "Selecciona tu personaje y comienza el ensayo."),
    ("status.fallbackUsed", "No se pudo leer el guion configurado. Mostramos una copia integrada."),
    ("status.yourTurn", "Tu turno. Di tu parlamento y pulsa Continuar."),
    ("status.playbackPaused", "Lectura en pausa."),
    ("status.playbackResumed", "Lectura reanudada."),
    ("status.playbackStopped", "Lectura detenida."),
    ("status.playbackFinished", "Lectura finalizada."),
    ("status.continuing", "Continuando…"),
    ("status.playingOthers", "Reproduciendo parlamentos de otros personajes…"),
    ("status.speechUnavailable", "La lectura en voz alta no está disponible."),
    ("status.speechUnavailableManual", "La lectura en voz alta no está disponible. Puedes leer y ocultar tus parlamentos manualmente."),
    ("status.selectCharacterFirst", "Selecciona tu personaje antes de iniciar la lectura."),
    ("status.noPlayLoaded", "Aún no se ha cargado el texto."),
    ("status.noOtherLines", "No hay parlamentos de otros personajes para reproducir."),
    ("status.speechError", "No se pudo reproducir la voz."),
    ("status.jumpError", "No se pudo reproducir ese fragmento."),
    // Labels
    ("label.author", "Autor: {author}"),
    ("label.textSizePx", "{size}px"),
    ("label.speechRateX", "{rate}x"),
    ("label.textSize", "Tamaño del texto: {size}"),
    ("label.speechRate", "Velocidad de lectura: {rate}"),
    ("label.language", "Idioma de lectura: {language}"),
    ("label.script", "Texto de la obra:"),
    ("label.hiddenLine", "(tu parlamento está oculto)"),
    ("label.selectCharacter", "¿Qué personaje interpretas?"),
    ("label.languageAutoDetect", "Detectar automáticamente (prioriza español)"),
    ("label.commands", "[enter/p] reproducir/pausar  [c] continuar  [s] detener  [j N] desde la línea N  [h] mostrar/ocultar  [t] texto  [r X] velocidad  [f N] tamaño  [l IDIOMA] idioma  [v] voces  [q] salir"),
    // Language names
    ("language.es", "Español"),
    ("language.en", "Inglés"),
    ("language.fr", "Francés"),
    ("language.pt", "Portugués"),
    ("language.it", "Italiano"),
    ("language.de", "Alemán"),
];

fn lookup(key: &str) -> Option<&'static str> {
    TRANSLATIONS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
}

/// Unknown keys come back unchanged.
pub fn t(key: &str) -> String {
    t_with(key, &[])
}

pub fn t_with(key: &str, params: &[(&str, &str)]) -> String {
    let Some(template) = lookup(key) else {
        warn!("Missing translation for key: {}", key);
        return key.to_string();
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        let name = &rest[open + 1..open + close];
        out.push_str(&rest[..open]);
        match params.iter().find(|(p, _)| *p == name) {
            Some((_, value)) => out.push_str(value),
            None => {
                warn!("Missing parameter \"{}\" for translation key: {}", name, key);
                out.push_str(&rest[open..=open + close]);
            }
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out
}

/// `"es-ES"` becomes `"Español (es-ES)"`; unknown languages stay as given.
pub fn format_language_label(lang_code: &str) -> String {
    let base = lang_code
        .split('-')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match lookup(&format!("language.{}", base)) {
        Some(friendly) => format!("{} ({})", friendly, lang_code),
        None => lang_code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lookup() {
        assert_eq!(t("status.playbackPaused"), "Lectura en pausa.");
        assert_eq!(t("status.nope"), "status.nope");
    }

    #[test]
    fn test_interpolation() {
        assert_eq!(
            t_with("label.author", &[("author", "J. Luis Alonso de Santos")]),
            "Autor: J. Luis Alonso de Santos"
        );
        assert_eq!(t_with("label.textSizePx", &[("size", "18")]), "18px");
        assert_eq!(
            t_with("label.speechRate", &[("rate", "1.25x")]),
            "Velocidad de lectura: 1.25x"
        );
        // Missing parameters are left in place
        assert_eq!(t_with("label.author", &[]), "Autor: {author}");
    }

    #[test]
    fn test_format_language_label() {
        assert_eq!(format_language_label("es-ES"), "Español (es-ES)");
        assert_eq!(format_language_label("EN-us"), "Inglés (EN-us)");
        assert_eq!(format_language_label("ja-JP"), "ja-JP");
    }
}
