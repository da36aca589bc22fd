//! encoding.rs
//!
//! Single-byte font encodings: the four standard tables, `/Differences`
//! overlays and the glyph-name to Unicode mapping (Adobe Glyph List
//! subset plus the algorithmic `uniXXXX` / `uXXXXXX` forms).

use std::collections::HashMap;

use crate::object::Object;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseEncoding {
    Standard,
    WinAnsi,
    MacRoman,
    MacExpert,
}

impl BaseEncoding {
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"StandardEncoding" => Some(BaseEncoding::Standard),
            b"WinAnsiEncoding" => Some(BaseEncoding::WinAnsi),
            b"MacRomanEncoding" => Some(BaseEncoding::MacRoman),
            b"MacExpertEncoding" => Some(BaseEncoding::MacExpert),
            _ => None,
        }
    }

    fn table(self) -> &'static [(u8, &'static str)] {
        match self {
            BaseEncoding::Standard => STANDARD_ENCODING,
            BaseEncoding::WinAnsi => WIN_ANSI_ENCODING,
            BaseEncoding::MacRoman => MAC_ROMAN_ENCODING,
            BaseEncoding::MacExpert => MAC_EXPERT_ENCODING,
        }
    }
}

/// A byte-code to glyph-name table, built from a base encoding plus any
/// `/Differences` overrides.
#[derive(Debug, Clone, Default)]
pub struct Encoding {
    names: HashMap<u8, String>,
    pub base: Option<BaseEncoding>,
}

impl Encoding {
    pub fn from_base(base: BaseEncoding) -> Self {
        let mut names = HashMap::new();
        for &(code, name) in base.table() {
            names.insert(code, name.to_string());
        }
        Encoding {
            names,
            base: Some(base),
        }
    }

    /// The `/Differences` array: an integer sets the current code, each
    /// following name assigns that glyph to the code, which increments.
    pub fn apply_differences(&mut self, diffs: &[Object]) {
        let mut code: i64 = 0;
        for entry in diffs {
            match entry {
                Object::Integer(i) => code = *i,
                Object::Real(r) => code = *r as i64,
                Object::Name(name) => {
                    if (0..=255).contains(&code) {
                        self.names
                            .insert(code as u8, String::from_utf8_lossy(name).into_owned());
                    }
                    code += 1;
                }
                _ => {}
            }
        }
    }

    pub fn glyph_name(&self, code: u8) -> Option<&str> {
        self.names.get(&code).map(String::as_str)
    }

    /// Unicode for a byte code, through the glyph name.
    pub fn unicode(&self, code: u8) -> Option<char> {
        glyph_name_to_unicode(self.glyph_name(code)?)
    }

    /// The byte code a glyph name is mapped at, if any.
    pub fn code_for_name(&self, name: &str) -> Option<u8> {
        self.names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(code, _)| *code)
    }
}

/// AGL lookup plus the `uniXXXX`, `uXXXX[XX]` algorithmic names. Single
/// printable-ASCII names map to themselves as a last resort.
pub fn glyph_name_to_unicode(name: &str) -> Option<char> {
    if let Ok(idx) = AGL.binary_search_by_key(&name, |&(n, _)| n) {
        return char::from_u32(AGL[idx].1);
    }
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() >= 4 {
            if let Ok(v) = u32::from_str_radix(&hex[..4], 16) {
                return char::from_u32(v);
            }
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            if let Ok(v) = u32::from_str_radix(hex, 16) {
                return char::from_u32(v);
            }
        }
    }
    // truncated suffix forms like "A.sc"
    if let Some(dot) = name.find('.') {
        if dot > 0 {
            return glyph_name_to_unicode(&name[..dot]);
        }
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_graphic() => Some(c),
        _ => None,
    }
}

// ----------------------------------------------------------------------
// encoding tables (ISO 32000 Appendix D)

#[rustfmt::skip]
static STANDARD_ENCODING: &[(u8, &str)] = &[
    (32, "space"), (33, "exclam"), (34, "quotedbl"), (35, "numbersign"),
    (36, "dollar"), (37, "percent"), (38, "ampersand"), (39, "quoteright"),
    (40, "parenleft"), (41, "parenright"), (42, "asterisk"), (43, "plus"),
    (44, "comma"), (45, "hyphen"), (46, "period"), (47, "slash"),
    (48, "zero"), (49, "one"), (50, "two"), (51, "three"), (52, "four"),
    (53, "five"), (54, "six"), (55, "seven"), (56, "eight"), (57, "nine"),
    (58, "colon"), (59, "semicolon"), (60, "less"), (61, "equal"), (62, "greater"),
    (63, "question"), (64, "at"), (65, "A"), (66, "B"), (67, "C"), (68, "D"),
    (69, "E"), (70, "F"), (71, "G"), (72, "H"), (73, "I"), (74, "J"), (75, "K"),
    (76, "L"), (77, "M"), (78, "N"), (79, "O"), (80, "P"), (81, "Q"), (82, "R"),
    (83, "S"), (84, "T"), (85, "U"), (86, "V"), (87, "W"), (88, "X"), (89, "Y"),
    (90, "Z"), (91, "bracketleft"), (92, "backslash"), (93, "bracketright"),
    (94, "asciicircum"), (95, "underscore"), (96, "quoteleft"), (97, "a"),
    (98, "b"), (99, "c"), (100, "d"), (101, "e"), (102, "f"), (103, "g"),
    (104, "h"), (105, "i"), (106, "j"), (107, "k"), (108, "l"), (109, "m"),
    (110, "n"), (111, "o"), (112, "p"), (113, "q"), (114, "r"), (115, "s"),
    (116, "t"), (117, "u"), (118, "v"), (119, "w"), (120, "x"), (121, "y"),
    (122, "z"), (123, "braceleft"), (124, "bar"), (125, "braceright"),
    (126, "asciitilde"), (161, "exclamdown"), (162, "cent"), (163, "sterling"),
    (164, "fraction"), (165, "yen"), (166, "florin"), (167, "section"),
    (168, "currency"), (169, "quotesingle"), (170, "quotedblleft"),
    (171, "guillemotleft"), (172, "guilsinglleft"), (173, "guilsinglright"),
    (174, "fi"), (175, "fl"), (177, "endash"), (178, "dagger"), (179, "daggerdbl"),
    (180, "periodcentered"), (182, "paragraph"), (183, "bullet"),
    (184, "quotesinglbase"), (185, "quotedblbase"), (186, "quotedblright"),
    (187, "guillemotright"), (188, "ellipsis"), (189, "perthousand"),
    (191, "questiondown"), (193, "grave"), (194, "acute"), (195, "circumflex"),
    (196, "tilde"), (197, "macron"), (198, "breve"), (199, "dotaccent"),
    (200, "dieresis"), (202, "ring"), (203, "cedilla"), (205, "hungarumlaut"),
    (206, "ogonek"), (207, "caron"), (208, "emdash"), (225, "AE"),
    (227, "ordfeminine"), (232, "Lslash"), (233, "Oslash"), (234, "OE"),
    (235, "ordmasculine"), (241, "ae"), (245, "dotlessi"), (248, "lslash"),
    (249, "oslash"), (250, "oe"), (251, "germandbls"),
];

#[rustfmt::skip]
static WIN_ANSI_ENCODING: &[(u8, &str)] = &[
    (32, "space"), (33, "exclam"), (34, "quotedbl"), (35, "numbersign"),
    (36, "dollar"), (37, "percent"), (38, "ampersand"), (39, "quotesingle"),
    (40, "parenleft"), (41, "parenright"), (42, "asterisk"), (43, "plus"),
    (44, "comma"), (45, "hyphen"), (46, "period"), (47, "slash"),
    (48, "zero"), (49, "one"), (50, "two"), (51, "three"), (52, "four"),
    (53, "five"), (54, "six"), (55, "seven"), (56, "eight"), (57, "nine"),
    (58, "colon"), (59, "semicolon"), (60, "less"), (61, "equal"), (62, "greater"),
    (63, "question"), (64, "at"), (65, "A"), (66, "B"), (67, "C"), (68, "D"),
    (69, "E"), (70, "F"), (71, "G"), (72, "H"), (73, "I"), (74, "J"), (75, "K"),
    (76, "L"), (77, "M"), (78, "N"), (79, "O"), (80, "P"), (81, "Q"), (82, "R"),
    (83, "S"), (84, "T"), (85, "U"), (86, "V"), (87, "W"), (88, "X"), (89, "Y"),
    (90, "Z"), (91, "bracketleft"), (92, "backslash"), (93, "bracketright"),
    (94, "asciicircum"), (95, "underscore"), (96, "grave"), (97, "a"),
    (98, "b"), (99, "c"), (100, "d"), (101, "e"), (102, "f"), (103, "g"),
    (104, "h"), (105, "i"), (106, "j"), (107, "k"), (108, "l"), (109, "m"),
    (110, "n"), (111, "o"), (112, "p"), (113, "q"), (114, "r"), (115, "s"),
    (116, "t"), (117, "u"), (118, "v"), (119, "w"), (120, "x"), (121, "y"),
    (122, "z"), (123, "braceleft"), (124, "bar"), (125, "braceright"),
    (126, "asciitilde"), (128, "Euro"), (130, "quotesinglbase"), (131, "florin"),
    (132, "quotedblbase"), (133, "ellipsis"), (134, "dagger"), (135, "daggerdbl"),
    (136, "circumflex"), (137, "perthousand"), (138, "Scaron"),
    (139, "guilsinglleft"), (140, "OE"), (142, "Zcaron"), (145, "quoteleft"),
    (146, "quoteright"), (147, "quotedblleft"), (148, "quotedblright"),
    (149, "bullet"), (150, "endash"), (151, "emdash"), (152, "tilde"),
    (153, "trademark"), (154, "scaron"), (155, "guilsinglright"), (156, "oe"),
    (158, "zcaron"), (159, "Ydieresis"), (161, "exclamdown"), (162, "cent"),
    (163, "sterling"), (164, "currency"), (165, "yen"), (166, "brokenbar"),
    (167, "section"), (168, "dieresis"), (169, "copyright"), (170, "ordfeminine"),
    (171, "guillemotleft"), (172, "logicalnot"), (173, "hyphen"),
    (174, "registered"), (175, "macron"), (176, "degree"), (177, "plusminus"),
    (178, "twosuperior"), (179, "threesuperior"), (180, "acute"), (181, "mu"),
    (182, "paragraph"), (183, "periodcentered"), (184, "cedilla"),
    (185, "onesuperior"), (186, "ordmasculine"), (187, "guillemotright"),
    (188, "onequarter"), (189, "onehalf"), (190, "threequarters"),
    (191, "questiondown"), (192, "Agrave"), (193, "Aacute"), (194, "Acircumflex"),
    (195, "Atilde"), (196, "Adieresis"), (197, "Aring"), (198, "AE"),
    (199, "Ccedilla"), (200, "Egrave"), (201, "Eacute"), (202, "Ecircumflex"),
    (203, "Edieresis"), (204, "Igrave"), (205, "Iacute"), (206, "Icircumflex"),
    (207, "Idieresis"), (208, "Eth"), (209, "Ntilde"), (210, "Ograve"),
    (211, "Oacute"), (212, "Ocircumflex"), (213, "Otilde"), (214, "Odieresis"),
    (215, "multiply"), (216, "Oslash"), (217, "Ugrave"), (218, "Uacute"),
    (219, "Ucircumflex"), (220, "Udieresis"), (221, "Yacute"), (222, "Thorn"),
    (223, "germandbls"), (224, "agrave"), (225, "aacute"), (226, "acircumflex"),
    (227, "atilde"), (228, "adieresis"), (229, "aring"), (230, "ae"),
    (231, "ccedilla"), (232, "egrave"), (233, "eacute"), (234, "ecircumflex"),
    (235, "edieresis"), (236, "igrave"), (237, "iacute"), (238, "icircumflex"),
    (239, "idieresis"), (240, "eth"), (241, "ntilde"), (242, "ograve"),
    (243, "oacute"), (244, "ocircumflex"), (245, "otilde"), (246, "odieresis"),
    (247, "divide"), (248, "oslash"), (249, "ugrave"), (250, "uacute"),
    (251, "ucircumflex"), (252, "udieresis"), (253, "yacute"), (254, "thorn"),
    (255, "ydieresis"),
];

#[rustfmt::skip]
static MAC_ROMAN_ENCODING: &[(u8, &str)] = &[
    (32, "space"), (33, "exclam"), (34, "quotedbl"), (35, "numbersign"),
    (36, "dollar"), (37, "percent"), (38, "ampersand"), (39, "quotesingle"),
    (40, "parenleft"), (41, "parenright"), (42, "asterisk"), (43, "plus"),
    (44, "comma"), (45, "hyphen"), (46, "period"), (47, "slash"),
    (48, "zero"), (49, "one"), (50, "two"), (51, "three"), (52, "four"),
    (53, "five"), (54, "six"), (55, "seven"), (56, "eight"), (57, "nine"),
    (58, "colon"), (59, "semicolon"), (60, "less"), (61, "equal"), (62, "greater"),
    (63, "question"), (64, "at"), (65, "A"), (66, "B"), (67, "C"), (68, "D"),
    (69, "E"), (70, "F"), (71, "G"), (72, "H"), (73, "I"), (74, "J"), (75, "K"),
    (76, "L"), (77, "M"), (78, "N"), (79, "O"), (80, "P"), (81, "Q"), (82, "R"),
    (83, "S"), (84, "T"), (85, "U"), (86, "V"), (87, "W"), (88, "X"), (89, "Y"),
    (90, "Z"), (91, "bracketleft"), (92, "backslash"), (93, "bracketright"),
    (94, "asciicircum"), (95, "underscore"), (96, "grave"), (97, "a"),
    (98, "b"), (99, "c"), (100, "d"), (101, "e"), (102, "f"), (103, "g"),
    (104, "h"), (105, "i"), (106, "j"), (107, "k"), (108, "l"), (109, "m"),
    (110, "n"), (111, "o"), (112, "p"), (113, "q"), (114, "r"), (115, "s"),
    (116, "t"), (117, "u"), (118, "v"), (119, "w"), (120, "x"), (121, "y"),
    (122, "z"), (123, "braceleft"), (124, "bar"), (125, "braceright"),
    (126, "asciitilde"), (128, "Adieresis"), (129, "Aring"), (130, "Ccedilla"),
    (131, "Eacute"), (132, "Ntilde"), (133, "Odieresis"), (134, "Udieresis"),
    (135, "aacute"), (136, "agrave"), (137, "acircumflex"), (138, "adieresis"),
    (139, "atilde"), (140, "aring"), (141, "ccedilla"), (142, "eacute"),
    (143, "egrave"), (144, "ecircumflex"), (145, "edieresis"), (146, "iacute"),
    (147, "igrave"), (148, "icircumflex"), (149, "idieresis"), (150, "ntilde"),
    (151, "oacute"), (152, "ograve"), (153, "ocircumflex"), (154, "odieresis"),
    (155, "otilde"), (156, "uacute"), (157, "ugrave"), (158, "ucircumflex"),
    (159, "udieresis"), (160, "dagger"), (161, "degree"), (162, "cent"),
    (163, "sterling"), (164, "section"), (165, "bullet"), (166, "paragraph"),
    (167, "germandbls"), (168, "registered"), (169, "copyright"),
    (170, "trademark"), (171, "acute"), (172, "dieresis"), (173, "notequal"),
    (174, "AE"), (175, "Oslash"), (176, "infinity"), (177, "plusminus"),
    (178, "lessequal"), (179, "greaterequal"), (180, "yen"), (181, "mu"),
    (182, "partialdiff"), (183, "summation"), (184, "product"), (185, "pi"),
    (186, "integral"), (187, "ordfeminine"), (188, "ordmasculine"),
    (189, "Omega"), (190, "ae"), (191, "oslash"), (192, "questiondown"),
    (193, "exclamdown"), (194, "logicalnot"), (195, "radical"), (196, "florin"),
    (197, "approxequal"), (198, "Delta"), (199, "guillemotleft"),
    (200, "guillemotright"), (201, "ellipsis"), (202, "space"), (203, "Agrave"),
    (204, "Atilde"), (205, "Otilde"), (206, "OE"), (207, "oe"), (208, "endash"),
    (209, "emdash"), (210, "quotedblleft"), (211, "quotedblright"),
    (212, "quoteleft"), (213, "quoteright"), (214, "divide"), (215, "lozenge"),
    (216, "ydieresis"), (217, "Ydieresis"), (218, "fraction"), (219, "currency"),
    (220, "guilsinglleft"), (221, "guilsinglright"), (222, "fi"), (223, "fl"),
    (224, "daggerdbl"), (225, "periodcentered"), (226, "quotesinglbase"),
    (227, "quotedblbase"), (228, "perthousand"), (229, "Acircumflex"),
    (230, "Ecircumflex"), (231, "Aacute"), (232, "Edieresis"), (233, "Egrave"),
    (234, "Iacute"), (235, "Icircumflex"), (236, "Idieresis"), (237, "Igrave"),
    (238, "Oacute"), (239, "Ocircumflex"), (241, "Ograve"), (242, "Uacute"),
    (243, "Ucircumflex"), (244, "Ugrave"), (245, "dotlessi"), (246, "circumflex"),
    (247, "tilde"), (248, "macron"), (249, "breve"), (250, "dotaccent"),
    (251, "ring"), (252, "cedilla"), (253, "hungarumlaut"), (254, "ogonek"),
    (255, "caron"),
];

/// Expert-set glyphs: small caps, oldstyle figures, fractions. Only the
/// slots with AGL-representable meanings are carried.
#[rustfmt::skip]
static MAC_EXPERT_ENCODING: &[(u8, &str)] = &[
    (32, "space"), (33, "exclamsmall"), (34, "Hungarumlautsmall"),
    (36, "dollaroldstyle"), (37, "dollarsuperior"), (38, "ampersandsmall"),
    (39, "Acutesmall"), (40, "parenleftsuperior"), (41, "parenrightsuperior"),
    (42, "twodotenleader"), (43, "onedotenleader"), (44, "comma"),
    (45, "hyphen"), (46, "period"), (47, "fraction"),
    (48, "zerooldstyle"), (49, "oneoldstyle"), (50, "twooldstyle"),
    (51, "threeoldstyle"), (52, "fouroldstyle"), (53, "fiveoldstyle"),
    (54, "sixoldstyle"), (55, "sevenoldstyle"), (56, "eightoldstyle"),
    (57, "nineoldstyle"), (58, "colon"), (59, "semicolon"),
    (61, "threequartersemdash"), (63, "questionsmall"), (68, "Ethsmall"),
    (71, "onequarter"), (72, "onehalf"), (73, "threequarters"),
    (74, "oneeighth"), (75, "threeeighths"), (76, "fiveeighths"),
    (77, "seveneighths"), (78, "onethird"), (79, "twothirds"),
    (86, "ff"), (87, "fi"), (88, "fl"), (89, "ffi"), (90, "ffl"),
    (91, "parenleftinferior"), (93, "parenrightinferior"),
    (94, "Circumflexsmall"), (95, "hypheninferior"), (96, "Gravesmall"),
    (97, "Asmall"), (98, "Bsmall"), (99, "Csmall"), (100, "Dsmall"),
    (101, "Esmall"), (102, "Fsmall"), (103, "Gsmall"), (104, "Hsmall"),
    (105, "Ismall"), (106, "Jsmall"), (107, "Ksmall"), (108, "Lsmall"),
    (109, "Msmall"), (110, "Nsmall"), (111, "Osmall"), (112, "Psmall"),
    (113, "Qsmall"), (114, "Rsmall"), (115, "Ssmall"), (116, "Tsmall"),
    (117, "Usmall"), (118, "Vsmall"), (119, "Wsmall"), (120, "Xsmall"),
    (121, "Ysmall"), (122, "Zsmall"), (123, "colonmonetary"),
    (124, "onefitted"), (125, "rupiah"), (126, "Tildesmall"),
    (161, "asuperior"), (162, "centsuperior"), (170, "theresuperior"),
    (189, "centinferior"), (190, "dollarinferior"), (191, "periodinferior"),
    (192, "commainferior"),
];

/// Adobe Glyph List subset, sorted by name for binary search. Covers the
/// four standard encodings plus the names common in embedded subsets.
#[rustfmt::skip]
static AGL: &[(&str, u32)] = &[
    ("A", 0x0041), ("AE", 0x00C6), ("Aacute", 0x00C1), ("Acircumflex", 0x00C2),
    ("Adieresis", 0x00C4), ("Agrave", 0x00C0), ("Aring", 0x00C5), ("Atilde", 0x00C3),
    ("B", 0x0042), ("C", 0x0043), ("Ccedilla", 0x00C7), ("D", 0x0044),
    ("Delta", 0x2206), ("E", 0x0045), ("Eacute", 0x00C9), ("Ecircumflex", 0x00CA),
    ("Edieresis", 0x00CB), ("Egrave", 0x00C8), ("Eth", 0x00D0), ("Euro", 0x20AC),
    ("F", 0x0046), ("G", 0x0047), ("Gamma", 0x0393), ("H", 0x0048),
    ("I", 0x0049), ("Iacute", 0x00CD), ("Icircumflex", 0x00CE),
    ("Idieresis", 0x00CF), ("Igrave", 0x00CC), ("J", 0x004A), ("K", 0x004B),
    ("L", 0x004C), ("Lslash", 0x0141), ("M", 0x004D), ("N", 0x004E),
    ("Ntilde", 0x00D1), ("O", 0x004F), ("OE", 0x0152), ("Oacute", 0x00D3),
    ("Ocircumflex", 0x00D4), ("Odieresis", 0x00D6), ("Ograve", 0x00D2),
    ("Omega", 0x2126), ("Oslash", 0x00D8), ("Otilde", 0x00D5), ("P", 0x0050),
    ("Phi", 0x03A6), ("Pi", 0x03A0), ("Q", 0x0051), ("R", 0x0052), ("S", 0x0053),
    ("Scaron", 0x0160), ("Sigma", 0x03A3), ("T", 0x0054), ("Theta", 0x0398),
    ("Thorn", 0x00DE), ("U", 0x0055), ("Uacute", 0x00DA), ("Ucircumflex", 0x00DB),
    ("Udieresis", 0x00DC), ("Ugrave", 0x00D9), ("V", 0x0056), ("W", 0x0057),
    ("X", 0x0058), ("Y", 0x0059), ("Yacute", 0x00DD), ("Ydieresis", 0x0178),
    ("Z", 0x005A), ("Zcaron", 0x017D), ("a", 0x0061), ("aacute", 0x00E1),
    ("acircumflex", 0x00E2), ("acute", 0x00B4), ("adieresis", 0x00E4),
    ("ae", 0x00E6), ("agrave", 0x00E0), ("ampersand", 0x0026),
    ("approxequal", 0x2248), ("aring", 0x00E5), ("asciicircum", 0x005E),
    ("asciitilde", 0x007E), ("asterisk", 0x002A), ("at", 0x0040),
    ("atilde", 0x00E3), ("b", 0x0062), ("backslash", 0x005C), ("bar", 0x007C),
    ("braceleft", 0x007B), ("braceright", 0x007D), ("bracketleft", 0x005B),
    ("bracketright", 0x005D), ("breve", 0x02D8), ("brokenbar", 0x00A6),
    ("bullet", 0x2022), ("c", 0x0063), ("caron", 0x02C7), ("ccedilla", 0x00E7),
    ("cedilla", 0x00B8), ("cent", 0x00A2), ("circumflex", 0x02C6),
    ("colon", 0x003A), ("comma", 0x002C), ("copyright", 0x00A9),
    ("currency", 0x00A4), ("d", 0x0064), ("dagger", 0x2020),
    ("daggerdbl", 0x2021), ("degree", 0x00B0), ("dieresis", 0x00A8),
    ("divide", 0x00F7), ("dollar", 0x0024), ("dotaccent", 0x02D9),
    ("dotlessi", 0x0131), ("e", 0x0065), ("eacute", 0x00E9),
    ("ecircumflex", 0x00EA), ("edieresis", 0x00EB), ("egrave", 0x00E8),
    ("eight", 0x0038), ("ellipsis", 0x2026), ("emdash", 0x2014),
    ("endash", 0x2013), ("equal", 0x003D), ("eth", 0x00F0), ("exclam", 0x0021),
    ("exclamdown", 0x00A1), ("f", 0x0066), ("ff", 0xFB00), ("ffi", 0xFB03),
    ("ffl", 0xFB04), ("fi", 0xFB01), ("five", 0x0035), ("fl", 0xFB02),
    ("florin", 0x0192), ("four", 0x0034), ("fraction", 0x2044), ("g", 0x0067),
    ("germandbls", 0x00DF), ("grave", 0x0060), ("greater", 0x003E),
    ("greaterequal", 0x2265), ("guillemotleft", 0x00AB),
    ("guillemotright", 0x00BB), ("guilsinglleft", 0x2039),
    ("guilsinglright", 0x203A), ("h", 0x0068), ("hungarumlaut", 0x02DD),
    ("hyphen", 0x002D), ("i", 0x0069), ("iacute", 0x00ED),
    ("icircumflex", 0x00EE), ("idieresis", 0x00EF), ("igrave", 0x00EC),
    ("infinity", 0x221E), ("integral", 0x222B), ("j", 0x006A), ("k", 0x006B),
    ("l", 0x006C), ("less", 0x003C), ("lessequal", 0x2264),
    ("logicalnot", 0x00AC), ("lozenge", 0x25CA), ("lslash", 0x0142),
    ("m", 0x006D), ("macron", 0x00AF), ("minus", 0x2212), ("mu", 0x00B5),
    ("multiply", 0x00D7), ("n", 0x006E), ("nine", 0x0039),
    ("notequal", 0x2260), ("ntilde", 0x00F1), ("numbersign", 0x0023),
    ("o", 0x006F), ("oacute", 0x00F3), ("ocircumflex", 0x00F4),
    ("odieresis", 0x00F6), ("oe", 0x0153), ("ogonek", 0x02DB),
    ("ograve", 0x00F2), ("one", 0x0031), ("onehalf", 0x00BD),
    ("onequarter", 0x00BC), ("onesuperior", 0x00B9), ("ordfeminine", 0x00AA),
    ("ordmasculine", 0x00BA), ("oslash", 0x00F8), ("otilde", 0x00F5),
    ("p", 0x0070), ("paragraph", 0x00B6), ("parenleft", 0x0028),
    ("parenright", 0x0029), ("partialdiff", 0x2202), ("percent", 0x0025),
    ("period", 0x002E), ("periodcentered", 0x00B7), ("perthousand", 0x2030),
    ("pi", 0x03C0), ("plus", 0x002B), ("plusminus", 0x00B1),
    ("product", 0x220F), ("q", 0x0071), ("question", 0x003F),
    ("questiondown", 0x00BF), ("quotedbl", 0x0022), ("quotedblbase", 0x201E),
    ("quotedblleft", 0x201C), ("quotedblright", 0x201D), ("quoteleft", 0x2018),
    ("quoteright", 0x2019), ("quotesinglbase", 0x201A), ("quotesingle", 0x0027),
    ("r", 0x0072), ("radical", 0x221A), ("registered", 0x00AE),
    ("ring", 0x02DA), ("s", 0x0073), ("scaron", 0x0161), ("section", 0x00A7),
    ("semicolon", 0x003B), ("seven", 0x0037), ("six", 0x0036),
    ("slash", 0x002F), ("space", 0x0020), ("sterling", 0x00A3),
    ("summation", 0x2211), ("t", 0x0074), ("thorn", 0x00FE), ("three", 0x0033),
    ("threequarters", 0x00BE), ("threesuperior", 0x00B3), ("tilde", 0x02DC),
    ("trademark", 0x2122), ("two", 0x0032), ("twosuperior", 0x00B2),
    ("u", 0x0075), ("uacute", 0x00FA), ("ucircumflex", 0x00FB),
    ("udieresis", 0x00FC), ("ugrave", 0x00F9), ("underscore", 0x005F),
    ("v", 0x0076), ("w", 0x0077), ("x", 0x0078), ("y", 0x0079),
    ("yacute", 0x00FD), ("ydieresis", 0x00FF), ("yen", 0x00A5), ("z", 0x007A),
    ("zcaron", 0x017E), ("zero", 0x0030),
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn win_ansi_maps_euro_and_letters() {
        let enc = Encoding::from_base(BaseEncoding::WinAnsi);
        assert_eq!(enc.glyph_name(0x41), Some("A"));
        assert_eq!(enc.glyph_name(0x80), Some("Euro"));
        assert_eq!(enc.unicode(0x80), Some('\u{20AC}'));
    }

    #[test]
    fn differences_walk_sets_and_increments() {
        let mut enc = Encoding::from_base(BaseEncoding::Standard);
        enc.apply_differences(&[
            Object::Integer(65),
            Object::Name(b"alpha".to_vec()),
            Object::Name(b"beta".to_vec()),
            Object::Integer(200),
            Object::Name(b"gamma".to_vec()),
        ]);
        assert_eq!(enc.glyph_name(65), Some("alpha"));
        assert_eq!(enc.glyph_name(66), Some("beta"));
        assert_eq!(enc.glyph_name(67), Some("C"));
        assert_eq!(enc.glyph_name(200), Some("gamma"));
    }

    #[test]
    fn agl_and_algorithmic_names() {
        assert_eq!(glyph_name_to_unicode("quotedblleft"), Some('\u{201C}'));
        assert_eq!(glyph_name_to_unicode("uni0041"), Some('A'));
        assert_eq!(glyph_name_to_unicode("u1F600"), Some('\u{1F600}'));
        assert_eq!(glyph_name_to_unicode("A.sc"), Some('A'));
        assert_eq!(glyph_name_to_unicode("g123456789"), None);
    }

    #[test]
    fn standard_vs_winansi_quoteright() {
        // code 39 differs between the two tables
        let std = Encoding::from_base(BaseEncoding::Standard);
        let win = Encoding::from_base(BaseEncoding::WinAnsi);
        assert_eq!(std.glyph_name(39), Some("quoteright"));
        assert_eq!(win.glyph_name(39), Some("quotesingle"));
    }

    #[test]
    fn code_for_name_reverse_lookup() {
        let enc = Encoding::from_base(BaseEncoding::WinAnsi);
        assert_eq!(enc.code_for_name("space"), Some(32));
        assert_eq!(enc.code_for_name("Euro"), Some(0x80));
    }
}
